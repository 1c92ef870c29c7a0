/// Settle time inserted after every clock edge.
pub trait Delay {
    fn spin(&mut self, cycles: u32);
}

/// Burns `cycles` iterations of a spin-loop hint. Not calibrated.
#[derive(Clone, Copy, Debug, Default)]
pub struct BusyWait;

impl Delay for BusyWait {
    #[inline(always)]
    fn spin(&mut self, cycles: u32) {
        for _ in 0..cycles {
            core::hint::spin_loop();
        }
    }
}

/// Records requested delays instead of waiting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CountingDelay {
    pub calls: usize,
    pub cycles: u64,
}

impl Delay for CountingDelay {
    fn spin(&mut self, cycles: u32) {
        self.calls += 1;
        self.cycles += cycles as u64;
    }
}
