//! Process instance registry

use super::instance::ProcessInstance;
use crate::error::{Result, SwarmError};

/// Registry of every process instance on this node.
///
/// Holds no lock of its own: the cluster state keeps it behind the
/// container lock.
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    instances: Vec<ProcessInstance>,
}

impl InstanceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instance
    pub fn insert(&mut self, instance: ProcessInstance) {
        self.instances.push(instance);
    }

    /// Remove an instance, returning it if present
    pub fn remove(&mut self, id: &str) -> Option<ProcessInstance> {
        let idx = self.instances.iter().position(|c| c.id == id)?;
        Some(self.instances.remove(idx))
    }

    /// Get instance by ID or name
    pub fn get(&self, id_or_name: &str) -> Result<&ProcessInstance> {
        self.instances
            .iter()
            .find(|c| c.id == id_or_name || c.name == id_or_name)
            .ok_or_else(|| SwarmError::InstanceNotFound(id_or_name.to_string()))
    }

    /// List all instances
    pub fn list(&self) -> &[ProcessInstance] {
        &self.instances
    }

    /// Get instance count
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swarm::service::{Service, ServiceSpec};

    fn instance(name: &str) -> ProcessInstance {
        let service = Service::new(ServiceSpec::default());
        ProcessInstance::for_service(&service, name.to_string())
    }

    #[test]
    fn test_insert_get_remove() {
        let mut registry = InstanceRegistry::new();
        let a = instance("web-0");
        let id = a.id.clone();
        registry.insert(a);
        registry.insert(instance("web-1"));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(&id).unwrap().name, "web-0");
        assert_eq!(registry.get("web-1").unwrap().name, "web-1");

        let removed = registry.remove(&id).unwrap();
        assert_eq!(removed.id, id);
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(&id).is_none());
    }

    #[test]
    fn test_get_missing() {
        let registry = InstanceRegistry::new();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.get("nope"),
            Err(SwarmError::InstanceNotFound(_))
        ));
    }
}
