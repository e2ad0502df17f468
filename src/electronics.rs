//! Readout electronics response: shaped impulse response per signal path,
//! discrimination constants, coincidence and dead times, and digitization.

/// Signal path through the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Path {
    /// Pre-amplifier / threshold-discriminator path.
    Thresh = 0,
    /// Post-amplification ADC path.
    Adc = 1,
}

impl Path {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Electronics parameter object, refreshed once per data-taking period.
///
/// All functions are deterministic; the randomized draws (threshold noise,
/// clock jitter, per-sample ADC noise) live with the callers.
#[derive(Debug, Clone)]
pub struct StrawElectronics {
    /// Peak response per unit charge for each path (mV/pC).
    pub dvdi: [f64; 2],
    /// Shaping time of each path (ns).
    pub shaping_time: [f64; 2],
    /// Multiples of the shaping time beyond which a cluster's response is
    /// treated as zero.
    pub response_span: f64,
    /// Nominal discriminator threshold (mV).
    pub threshold: f64,
    /// RMS analog noise per path (mV).
    pub analog_noise: [f64; 2],
    /// Analog dead time between accepted crossings on one end (ns).
    pub dead_time_analog: f64,
    /// Digital dead time after a triggered readout (ns).
    pub dead_time_digital: f64,
    /// RMS of the shared TDC clock jitter (ns).
    pub clock_jitter: f64,
    /// End-to-end coincidence window (ns, inclusive).
    pub coincidence_window: f64,
    /// Start of the beam-flash blanking interval within the period (ns).
    pub flash_start: f64,
    /// End of the blanking interval; readout enables here (ns).
    pub flash_end: f64,
    /// Periodic readout (microbunch) length (ns).
    pub readout_period: f64,
    /// ADC sample period (ns).
    pub adc_period: f64,
    /// ADC samples per digi.
    pub n_adc_samples: usize,
    /// ADC samples taken before the threshold crossing.
    pub n_adc_presamples: usize,
    /// ADC least count (mV).
    pub adc_lsb: f64,
    /// ADC pedestal (counts).
    pub adc_pedestal: u16,
    /// ADC saturation (counts).
    pub adc_max: u16,
    /// TDC least count (ns).
    pub tdc_lsb: f64,
    /// TDC full range (counts).
    pub tdc_max: u16,
    /// TOT clock least count (ns).
    pub tot_lsb: f64,
    /// TOT full range (counts).
    pub tot_max: u16,
    /// Coarse step of the threshold-crossing search (ns).
    pub scan_step: f64,
    /// Bisection tolerance of the crossing search (ns).
    pub scan_tolerance: f64,
}

impl Default for StrawElectronics {
    fn default() -> StrawElectronics {
        StrawElectronics {
            dvdi: [110.0, 22.0],
            shaping_time: [20.0, 40.0],
            response_span: 10.0,
            threshold: 12.0,
            analog_noise: [2.0, 1.0],
            dead_time_analog: 100.0,
            dead_time_digital: 200.0,
            clock_jitter: 0.2,
            coincidence_window: 50.0,
            flash_start: 200.0,
            flash_end: 500.0,
            readout_period: 1695.0,
            adc_period: 20.0,
            n_adc_samples: 12,
            n_adc_presamples: 3,
            adc_lsb: 0.25,
            adc_pedestal: 64,
            adc_max: 4095,
            tdc_lsb: 0.0625,
            tdc_max: u16::MAX,
            tot_lsb: 5.0,
            tot_max: 15,
            scan_step: 1.0,
            scan_tolerance: 0.01,
        }
    }
}

impl StrawElectronics {
    /// Impulse response of one path to a unit charge arriving at `t = 0`
    /// (mV/pC). Single-pole shaping, peak-normalized to `dvdi` at the
    /// shaping time.
    pub fn linear_response(&self, path: Path, t: f64) -> f64 {
        if t < 0.0 || t > self.max_response_time(path) {
            return 0.0;
        }
        let tau = self.shaping_time[path.index()];
        self.dvdi[path.index()] * (t / tau) * (1.0 - t / tau).exp()
    }

    /// Support of the impulse response: responses older than this are
    /// negligible and skipped during waveform summation.
    pub fn max_response_time(&self, path: Path) -> f64 {
        self.response_span * self.shaping_time[path.index()]
    }

    pub fn noise(&self, path: Path) -> f64 {
        self.analog_noise[path.index()]
    }

    /// Fold a global time into the periodic readout window `[0, period)`.
    pub fn fold_time(&self, t: f64) -> f64 {
        t.rem_euclid(self.readout_period)
    }

    /// Buffer covering one full digitized waveform (ns); clusters folded
    /// below `flash_start` plus this buffer need a ghost duplicate.
    pub fn waveform_buffer(&self) -> f64 {
        self.n_adc_samples as f64 * self.adc_period
    }

    /// Latest time the discriminator may fire in the extended window.
    pub fn readout_end(&self) -> f64 {
        self.readout_period + self.flash_start
    }

    /// Whether two crossing times are end-to-end coincident. The window edge
    /// is inclusive.
    pub fn combine_ends(&self, t0: f64, t1: f64) -> bool {
        (t1 - t0).abs() <= self.coincidence_window
    }

    /// ADC sample times anchored to a threshold-crossing time.
    pub fn adc_times(&self, t: f64) -> Vec<f64> {
        (0..self.n_adc_samples)
            .map(|i| t + (i as f64 - self.n_adc_presamples as f64) * self.adc_period)
            .collect()
    }

    /// Digitize one time to TDC counts, clamped to the TDC range.
    pub fn digitize_time(&self, t: f64) -> u16 {
        let counts = (t / self.tdc_lsb).round().max(0.0) as u32;
        counts.min(self.tdc_max as u32) as u16
    }

    /// Digitize sampled voltages to ADC counts, pedestal-shifted and clamped
    /// to the saturation range.
    pub fn digitize_waveform(&self, volts: &[f64]) -> Vec<u16> {
        volts
            .iter()
            .map(|v| {
                let counts = (v / self.adc_lsb).round() as i64 + self.adc_pedestal as i64;
                counts.clamp(0, self.adc_max as i64) as u16
            })
            .collect()
    }
}
