//! Definition of counters, used for retry attempts and ceilings of the policy engine.

/// Counter errors.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The counter went above its maximum value.
    Exceeded,
}

/// A saturating counter with a ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Counter {
    value: u8,
    max_value: u8,
}

/// Types of counters, and their ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CounterType {
    /// Number of sent Source_Capabilities messages (nCapsCount).
    Caps,
    /// Number of sent Discover Identity requests (nDiscoverIdentityCount).
    DiscoverIdentity,
    /// Number of hard resets (nHardResetCount).
    HardReset,
    /// Number of hard resets that were caused by failing power role swaps (nHardResetCount).
    SwapHardReset,
}

impl CounterType {
    /// The ceiling of this counter type.
    pub const fn max_value(self) -> u8 {
        // See USB PD R3.2, [Table 6.70]
        match self {
            CounterType::Caps => 50,
            CounterType::DiscoverIdentity => 20,
            CounterType::HardReset => 2,
            CounterType::SwapHardReset => 2,
        }
    }
}

impl Counter {
    /// Create a new counter at zero.
    pub const fn new(counter_type: CounterType) -> Self {
        Self {
            value: 0,
            max_value: counter_type.max_value(),
        }
    }

    /// Create a new counter with a start value.
    pub fn new_from_value(counter_type: CounterType, value: u8) -> Self {
        let mut counter = Self::new(counter_type);
        counter.set(value);
        counter
    }

    /// Set the counter value.
    pub fn set(&mut self, value: u8) {
        self.value = value;
    }

    /// The current value.
    pub fn value(&self) -> u8 {
        self.value
    }

    /// The ceiling of the counter.
    pub fn max_value(&self) -> u8 {
        self.max_value
    }

    /// Whether the value is above the ceiling.
    pub fn exceeded(&self) -> bool {
        self.value > self.max_value
    }

    /// Increment the counter.
    ///
    /// Fails, if the new value is above the ceiling. The counter saturates and never wraps.
    pub fn increment(&mut self) -> Result<(), Error> {
        self.value = self.value.saturating_add(1);

        if self.exceeded() { Err(Error::Exceeded) } else { Ok(()) }
    }

    /// Reset the counter to zero.
    pub fn reset(&mut self) {
        self.value = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::{Counter, CounterType, Error};

    #[test]
    fn test_hard_reset_ceiling() {
        let mut counter = Counter::new(CounterType::HardReset);

        assert_eq!(counter.increment(), Ok(()));
        assert_eq!(counter.increment(), Ok(()));
        assert!(!counter.exceeded());

        assert_eq!(counter.increment(), Err(Error::Exceeded));
        assert!(counter.exceeded());
        assert_eq!(counter.value(), 3);

        // Stays exceeded, does not wrap.
        assert_eq!(counter.increment(), Err(Error::Exceeded));
        assert_eq!(counter.value(), 4);

        counter.reset();
        assert_eq!(counter.value(), 0);
        assert!(!counter.exceeded());
    }

    #[test]
    fn test_saturation() {
        let mut counter = Counter::new_from_value(CounterType::Caps, u8::MAX);
        assert!(counter.increment().is_err());
        assert_eq!(counter.value(), u8::MAX);
    }
}
