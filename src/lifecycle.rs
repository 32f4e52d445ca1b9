//! Adapter for persistence lifecycle hooks.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::debug;

use crate::engine::AclSynthesizer;
use crate::error::AclError;
use crate::store::AclStore;
use crate::traits::AclObject;

/// A persistence event reported by the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LifecycleEvent {
    Persisted,
    Updated,
    Removed,
}

impl<S: AclStore> AclSynthesizer<S> {
    /// Dispatch a lifecycle event for `object`.
    ///
    /// Objects whose type is unregistered or not securable are skipped and
    /// `Ok(false)` is returned. Otherwise `Persisted` and `Updated` synthesize,
    /// `Removed` deletes, and `Ok(true)` is returned.
    pub fn on_lifecycle_event(
        &self,
        event: LifecycleEvent,
        object: &impl AclObject,
    ) -> Result<bool, AclError> {
        let type_tag = object.acl_type();
        if !self.schemas().is_securable(&type_tag) {
            debug!(event = "Lifecycle", phase = "Skipped", trigger = %event, type_tag = %type_tag);
            return Ok(false);
        }

        match event {
            LifecycleEvent::Persisted | LifecycleEvent::Updated => {
                self.synthesize(object)?;
            }
            LifecycleEvent::Removed => {
                self.delete(object)?;
            }
        }
        Ok(true)
    }
}
