//! Ownership of the live mechanism and its reactor.

use crate::error::{ModelError, ModelResult};
use serde::ser::{Error as _, Serialize, Serializer};

#[derive(Debug)]
struct Live<G, R> {
    gas: G,
    reactor: R,
}

/// Holds either nothing or a fully constructed mechanism/reactor pair.
///
/// The pair is attached and dropped as a unit. Serializing a non-blank
/// lifecycle is an error; it serializes as `null` once blanked.
#[derive(Debug)]
pub struct Lifecycle<G, R> {
    live: Option<Live<G, R>>,
}

impl<G, R> Default for Lifecycle<G, R> {
    fn default() -> Self {
        Self { live: None }
    }
}

impl<G, R> Lifecycle<G, R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the mechanism and reactor. Calling this on a blank lifecycle is a no-op.
    pub fn blank(&mut self) {
        if self.live.take().is_some() {
            tracing::debug!("chemistry blanked");
        }
    }

    pub fn is_blank(&self) -> bool {
        self.live.is_none()
    }

    /// Install a constructed pair, replacing any previous one.
    pub fn attach(&mut self, gas: G, reactor: R) {
        self.live = Some(Live { gas, reactor });
    }

    pub fn gas(&self) -> ModelResult<&G> {
        self.live
            .as_ref()
            .map(|l| &l.gas)
            .ok_or(ModelError::UninitializedMechanism)
    }

    pub fn gas_mut(&mut self) -> ModelResult<&mut G> {
        self.live
            .as_mut()
            .map(|l| &mut l.gas)
            .ok_or(ModelError::UninitializedMechanism)
    }

    pub fn reactor(&self) -> ModelResult<&R> {
        self.live
            .as_ref()
            .map(|l| &l.reactor)
            .ok_or(ModelError::UninitializedMechanism)
    }

    pub fn reactor_mut(&mut self) -> ModelResult<&mut R> {
        self.live
            .as_mut()
            .map(|l| &mut l.reactor)
            .ok_or(ModelError::UninitializedMechanism)
    }

    /// Both halves at once, for solves that read the mechanism while driving the reactor.
    pub fn split_mut(&mut self) -> ModelResult<(&mut G, &mut R)> {
        self.live
            .as_mut()
            .map(|l| (&mut l.gas, &mut l.reactor))
            .ok_or(ModelError::UninitializedMechanism)
    }
}

impl<G, R> Serialize for Lifecycle<G, R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.live.is_some() {
            return Err(S::Error::custom(
                "live chemistry must be blanked before serialization",
            ));
        }
        serializer.serialize_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_is_idempotent() {
        let mut lc: Lifecycle<u32, &str> = Lifecycle::new();
        lc.blank();
        assert!(lc.is_blank());
        lc.attach(7, "reactor");
        lc.blank();
        lc.blank();
        assert!(lc.is_blank());
        assert!(matches!(lc.gas(), Err(ModelError::UninitializedMechanism)));
    }

    #[test]
    fn attach_exposes_both_halves() {
        let mut lc = Lifecycle::new();
        lc.attach(1_u32, String::from("r"));
        *lc.gas_mut().unwrap() += 1;
        lc.reactor_mut().unwrap().push('x');
        let (g, r) = lc.split_mut().unwrap();
        assert_eq!((*g, r.as_str()), (2, "rx"));
    }

    #[test]
    fn serialization_requires_blank() {
        let mut lc = Lifecycle::new();
        lc.attach(1_u32, ());
        assert!(serde_json::to_string(&lc).is_err());
        lc.blank();
        assert_eq!(serde_json::to_string(&lc).unwrap(), "null");
    }
}
