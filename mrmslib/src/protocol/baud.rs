/// Rates both ends of the link know how to use.
pub const BAUD_RATES: [u32; 12] = [
    300, 600, 1200, 2400, 4800, 9600, 14400, 19200, 28800, 38400, 57600, 115200,
];

/// A standard serial data rate, in bits per second.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BaudRate(u32);

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BaudRateError {
    NonStandard(u32),
}

#[cfg(feature = "std")]
impl std::error::Error for BaudRateError {}

impl core::fmt::Display for BaudRateError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            BaudRateError::NonStandard(rate) => write!(
                f,
                "{} is not a standard rate, use one of {:?}",
                rate, BAUD_RATES
            ),
        }
    }
}

impl BaudRate {
    pub const fn new(rate: u32) -> Result<Self, BaudRateError> {
        let mut i = 0;
        while i < BAUD_RATES.len() {
            if BAUD_RATES[i] == rate {
                return Ok(Self(rate));
            }
            i += 1;
        }
        Err(BaudRateError::NonStandard(rate))
    }

    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl Default for BaudRate {
    fn default() -> Self {
        Self(super::BAUD_RATE)
    }
}

impl core::fmt::Display for BaudRate {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl core::str::FromStr for BaudRate {
    type Err = BaudRateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // anything that isn't a number can't be a standard rate either
        let rate = s.trim().parse().unwrap_or(0);
        Self::new(rate)
    }
}
