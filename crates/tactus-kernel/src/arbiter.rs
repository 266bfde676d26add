//! [`Arbiter`] – exclusive ownership of mechanism resources.
//!
//! Every mechanism is registered once at construction and receives a
//! [`ResourceId`]. While the system runs, the arbiter records which action
//! owns which resource; the scheduler consults it before admitting a request
//! and is the only caller that mutates ownership. A resource with no owner
//! falls back to its default action, if one is registered.

use tactus_types::{ActionId, ResourceId, TactusError};

/// Ownership ledger for mechanism resources.
///
/// # Example
///
/// ```
/// use tactus_kernel::arbiter::Arbiter;
/// use tactus_types::ActionId;
///
/// let mut arbiter = Arbiter::new();
/// let drive = arbiter.register_resource("drive").unwrap();
///
/// assert!(arbiter.is_free(drive));
/// arbiter.claim(ActionId::new(0), &[drive]);
/// assert_eq!(arbiter.owner(drive), Some(ActionId::new(0)));
/// ```
#[derive(Default)]
pub struct Arbiter {
    names: Vec<String>,
    owners: Vec<Option<ActionId>>,
    defaults: Vec<Option<ActionId>>,
}

impl Arbiter {
    /// Create an empty ledger with no resources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mechanism resource under a unique printable name.
    ///
    /// # Errors
    ///
    /// [`TactusError::DuplicateMechanism`] when the name is already taken.
    pub fn register_resource(&mut self, name: impl Into<String>) -> Result<ResourceId, TactusError> {
        let name = name.into();
        if self.names.iter().any(|n| *n == name) {
            return Err(TactusError::DuplicateMechanism(name));
        }
        let id = ResourceId::new(self.names.len());
        self.names.push(name);
        self.owners.push(None);
        self.defaults.push(None);
        Ok(id)
    }

    /// Look up a resource handle by name.
    pub fn resource_id(&self, name: &str) -> Option<ResourceId> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(ResourceId::new)
    }

    /// Printable name for `id`, or the raw handle text if unregistered.
    pub fn name(&self, id: ResourceId) -> String {
        self.names
            .get(id.index())
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All registered resource handles.
    pub fn ids(&self) -> impl Iterator<Item = ResourceId> + '_ {
        (0..self.names.len()).map(ResourceId::new)
    }

    /// Check that every handle in `resources` refers to a registered
    /// resource.
    ///
    /// # Errors
    ///
    /// [`TactusError::UnknownResource`] for the first unregistered handle.
    pub fn validate(&self, resources: &[ResourceId]) -> Result<(), TactusError> {
        for r in resources {
            if r.index() >= self.names.len() {
                return Err(TactusError::UnknownResource(r.to_string()));
            }
        }
        Ok(())
    }

    /// Current owner of `id`, if any.
    pub fn owner(&self, id: ResourceId) -> Option<ActionId> {
        self.owners.get(id.index()).copied().flatten()
    }

    pub fn is_free(&self, id: ResourceId) -> bool {
        self.owner(id).is_none()
    }

    /// Distinct owners currently holding any of `resources`, in first-seen
    /// order. Empty means the whole set is free.
    pub fn conflicts(&self, resources: &[ResourceId]) -> Vec<ActionId> {
        let mut held = Vec::new();
        for r in resources {
            if let Some(owner) = self.owner(*r)
                && !held.contains(&owner)
            {
                held.push(owner);
            }
        }
        held
    }

    /// Record `action` as the owner of every resource in `resources`.
    ///
    /// The scheduler resolves conflicts before calling this; claiming an
    /// owned resource is a scheduler bug.
    pub fn claim(&mut self, action: ActionId, resources: &[ResourceId]) {
        for r in resources {
            debug_assert!(
                self.owners[r.index()].is_none(),
                "claim of owned resource {r}"
            );
            self.owners[r.index()] = Some(action);
        }
    }

    /// Release every resource owned by `action`. No-ops when it owns none.
    pub fn release_all(&mut self, action: ActionId) {
        for slot in &mut self.owners {
            if *slot == Some(action) {
                *slot = None;
            }
        }
    }

    /// Register the action re-admitted whenever `resource` is unowned.
    ///
    /// # Errors
    ///
    /// [`TactusError::DuplicateDefault`] when the resource already has one.
    pub fn set_default(&mut self, resource: ResourceId, action: ActionId) -> Result<(), TactusError> {
        self.validate(&[resource])?;
        let slot = &mut self.defaults[resource.index()];
        if slot.is_some() {
            return Err(TactusError::DuplicateDefault(
                self.names[resource.index()].clone(),
            ));
        }
        *slot = Some(action);
        Ok(())
    }

    /// Default action for `resource`, if one is registered.
    pub fn default_for(&self, resource: ResourceId) -> Option<ActionId> {
        self.defaults.get(resource.index()).copied().flatten()
    }

    /// Resources that currently have no owner, in registration order.
    pub fn unowned(&self) -> Vec<ResourceId> {
        self.owners
            .iter()
            .enumerate()
            .filter(|(_, o)| o.is_none())
            .map(|(i, _)| ResourceId::new(i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup() {
        let mut arb = Arbiter::new();
        let drive = arb.register_resource("drive").unwrap();
        let elevator = arb.register_resource("elevator").unwrap();

        assert_eq!(arb.resource_id("drive"), Some(drive));
        assert_eq!(arb.resource_id("elevator"), Some(elevator));
        assert_eq!(arb.resource_id("winch"), None);
        assert_eq!(arb.name(drive), "drive");
        assert_eq!(arb.len(), 2);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut arb = Arbiter::new();
        arb.register_resource("drive").unwrap();
        let result = arb.register_resource("drive");
        assert!(matches!(result, Err(TactusError::DuplicateMechanism(_))));
    }

    #[test]
    fn validate_rejects_unregistered_handles() {
        let mut arb = Arbiter::new();
        let drive = arb.register_resource("drive").unwrap();
        assert!(arb.validate(&[drive]).is_ok());

        let bogus = ResourceId::new(7);
        assert!(matches!(
            arb.validate(&[drive, bogus]),
            Err(TactusError::UnknownResource(_))
        ));
    }

    #[test]
    fn claim_records_ownership() {
        let mut arb = Arbiter::new();
        let drive = arb.register_resource("drive").unwrap();
        let elevator = arb.register_resource("elevator").unwrap();

        arb.claim(ActionId::new(4), &[drive, elevator]);
        assert_eq!(arb.owner(drive), Some(ActionId::new(4)));
        assert_eq!(arb.owner(elevator), Some(ActionId::new(4)));
        assert!(!arb.is_free(drive));
    }

    #[test]
    fn conflicts_lists_each_owner_once() {
        let mut arb = Arbiter::new();
        let drive = arb.register_resource("drive").unwrap();
        let elevator = arb.register_resource("elevator").unwrap();
        let intake = arb.register_resource("intake").unwrap();

        arb.claim(ActionId::new(1), &[drive, elevator]);
        arb.claim(ActionId::new(2), &[intake]);

        let held = arb.conflicts(&[drive, elevator, intake]);
        assert_eq!(held, vec![ActionId::new(1), ActionId::new(2)]);
        assert!(arb.conflicts(&[]).is_empty());
    }

    #[test]
    fn release_all_frees_every_holding() {
        let mut arb = Arbiter::new();
        let drive = arb.register_resource("drive").unwrap();
        let elevator = arb.register_resource("elevator").unwrap();

        arb.claim(ActionId::new(1), &[drive, elevator]);
        arb.release_all(ActionId::new(1));
        assert!(arb.is_free(drive));
        assert!(arb.is_free(elevator));
    }

    #[test]
    fn release_of_non_owner_is_noop() {
        let mut arb = Arbiter::new();
        let drive = arb.register_resource("drive").unwrap();
        arb.claim(ActionId::new(1), &[drive]);
        arb.release_all(ActionId::new(9));
        assert_eq!(arb.owner(drive), Some(ActionId::new(1)));
    }

    #[test]
    fn default_registration_is_exclusive() {
        let mut arb = Arbiter::new();
        let drive = arb.register_resource("drive").unwrap();

        arb.set_default(drive, ActionId::new(0)).unwrap();
        assert_eq!(arb.default_for(drive), Some(ActionId::new(0)));

        let again = arb.set_default(drive, ActionId::new(1));
        assert!(matches!(again, Err(TactusError::DuplicateDefault(_))));
        // First registration is untouched.
        assert_eq!(arb.default_for(drive), Some(ActionId::new(0)));
    }

    #[test]
    fn default_for_unknown_resource_fails_validation() {
        let mut arb = Arbiter::new();
        let result = arb.set_default(ResourceId::new(3), ActionId::new(0));
        assert!(matches!(result, Err(TactusError::UnknownResource(_))));
    }

    #[test]
    fn unowned_tracks_free_resources() {
        let mut arb = Arbiter::new();
        let drive = arb.register_resource("drive").unwrap();
        let elevator = arb.register_resource("elevator").unwrap();

        assert_eq!(arb.unowned(), vec![drive, elevator]);
        arb.claim(ActionId::new(1), &[drive]);
        assert_eq!(arb.unowned(), vec![elevator]);
        arb.release_all(ActionId::new(1));
        assert_eq!(arb.unowned(), vec![drive, elevator]);
    }
}
