//! Service scheduling
//!
//! Services are expanded into tasks when created or updated. Each task gets a
//! freshly synthesized process instance and is placed on the node under the
//! round-robin cursor. Updates replace every task of the service.

use super::cluster::{ClusterState, SwarmRegistry};
use super::filter::Filters;
use super::generate_id;
use super::node::Node;
use super::service::{Service, ServiceSpec};
use super::task::Task;
use crate::container::{InstanceRegistry, ProcessInstance};
use crate::error::{Result, SwarmError};
use tracing::{debug, info};

/// Suffix of instance names created by a service update
const UPDATED_SUFFIX: &str = "-updated";

/// Round-robin placement cursor over the node registry
#[derive(Debug, Clone, Default)]
pub struct RoundRobin {
    cursor: usize,
}

impl RoundRobin {
    /// Pick the node under the cursor and advance it.
    ///
    /// The cursor is reduced modulo the current node count first, so it
    /// survives nodes being removed.
    pub fn next<'a>(&mut self, nodes: &'a [Node]) -> Result<&'a Node> {
        if nodes.is_empty() {
            return Err(SwarmError::NoNodes);
        }
        let idx = self.cursor % nodes.len();
        self.cursor = (idx + 1) % nodes.len();
        Ok(&nodes[idx])
    }

    /// Current cursor position
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

/// Build the tasks and instances of `service` without registering them
fn place_tasks(
    registry: &mut SwarmRegistry,
    service: &Service,
    suffix: &str,
) -> Result<Vec<(Task, ProcessInstance)>> {
    let count = service.spec.desired_tasks(registry.nodes.len())?;
    let mut placed = Vec::new();

    for index in 0..count {
        let node = registry.placement.next(&registry.nodes)?;
        let name = format!("{}-{}{}", service.spec.name, index, suffix);
        let instance = ProcessInstance::for_service(service, name);
        let task = Task::scheduled(service, index, &node.id, &instance.id);
        debug!(
            "Placed task {} of service {} on node {}",
            task.id, service.spec.name, node.id
        );
        placed.push((task, instance));
    }

    Ok(placed)
}

/// Drop every task of `service_id` together with its instance
fn remove_service_tasks(
    containers: &mut InstanceRegistry,
    tasks: &mut Vec<Task>,
    service_id: &str,
) -> usize {
    let (removed, kept): (Vec<Task>, Vec<Task>) = std::mem::take(tasks)
        .into_iter()
        .partition(|t| t.service_id == service_id);
    *tasks = kept;

    for task in &removed {
        containers.remove(task.container_id());
    }
    removed.len()
}

fn service_index(registry: &SwarmRegistry, id_or_name: &str) -> Result<usize> {
    registry
        .services
        .iter()
        .position(|s| s.matches(id_or_name))
        .ok_or_else(|| SwarmError::ServiceNotFound(id_or_name.to_string()))
}

impl ClusterState {
    fn commit(
        &self,
        containers: &mut InstanceRegistry,
        tasks: &mut Vec<Task>,
        placed: Vec<(Task, ProcessInstance)>,
    ) {
        for (task, instance) in placed {
            self.notify(&instance);
            containers.insert(instance);
            tasks.push(task);
        }
    }

    /// Create a service and schedule its tasks
    pub async fn create_service(&self, mut spec: ServiceSpec) -> Result<Service> {
        let mut containers = self.containers.lock().await;
        let mut guard = self.swarm.lock().await;
        let registry = &mut *guard;
        registry.ensure_swarm()?;
        if registry.nodes.is_empty() {
            return Err(SwarmError::NoNodes);
        }

        if spec.name.is_empty() {
            spec.name = generate_id();
        }
        if registry.services.iter().any(|s| s.spec.name == spec.name) {
            return Err(SwarmError::NameConflict(spec.name));
        }

        let service = Service::new(spec);
        let placed = place_tasks(registry, &service, "")?;
        let count = placed.len();
        self.commit(&mut containers, &mut registry.tasks, placed);
        registry.services.push(service.clone());

        info!(
            "Created service {} ({}) with {} tasks",
            service.spec.name, service.id, count
        );
        Ok(service)
    }

    /// Replace the spec of a service and reschedule all of its tasks
    pub async fn update_service(&self, id_or_name: &str, mut spec: ServiceSpec) -> Result<Service> {
        let mut containers = self.containers.lock().await;
        let mut guard = self.swarm.lock().await;
        let registry = &mut *guard;
        registry.ensure_swarm()?;

        let idx = service_index(registry, id_or_name)?;
        if spec.name.is_empty() {
            spec.name = registry.services[idx].spec.name.clone();
        }
        let taken = registry
            .services
            .iter()
            .enumerate()
            .any(|(i, s)| i != idx && s.spec.name == spec.name);
        if taken {
            return Err(SwarmError::NameConflict(spec.name));
        }

        let mut service = registry.services[idx].clone();
        service.update(spec);

        // Place first so a failure leaves the old tasks in place
        let placed = place_tasks(registry, &service, UPDATED_SUFFIX)?;
        let removed = remove_service_tasks(&mut containers, &mut registry.tasks, &service.id);
        let count = placed.len();
        self.commit(&mut containers, &mut registry.tasks, placed);
        registry.services[idx] = service.clone();

        info!(
            "Updated service {} to version {} ({} tasks replaced by {})",
            service.spec.name, service.version.index, removed, count
        );
        Ok(service)
    }

    /// Delete a service with all of its tasks and instances
    pub async fn delete_service(&self, id_or_name: &str) -> Result<()> {
        let mut containers = self.containers.lock().await;
        let mut guard = self.swarm.lock().await;
        let registry = &mut *guard;
        registry.ensure_swarm()?;

        let idx = service_index(registry, id_or_name)?;
        let service = registry.services.swap_remove(idx);
        let removed = remove_service_tasks(&mut containers, &mut registry.tasks, &service.id);

        info!(
            "Deleted service {} ({}) and {} tasks",
            service.spec.name, service.id, removed
        );
        Ok(())
    }

    /// Inspect a service by ID or name
    pub async fn inspect_service(&self, id_or_name: &str) -> Result<Service> {
        let guard = self.swarm.lock().await;
        guard.ensure_swarm()?;
        let idx = service_index(&guard, id_or_name)?;
        Ok(guard.services[idx].clone())
    }

    /// List services passing `filters`
    pub async fn list_services(&self, filters: &Filters) -> Result<Vec<Service>> {
        let guard = self.swarm.lock().await;
        guard.ensure_swarm()?;
        Ok(guard
            .services
            .iter()
            .filter(|s| filters.matches_service(s))
            .cloned()
            .collect())
    }

    /// Inspect a task by ID
    pub async fn inspect_task(&self, id: &str) -> Result<Task> {
        let guard = self.swarm.lock().await;
        guard.ensure_swarm()?;
        guard
            .tasks
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| SwarmError::TaskNotFound(id.to_string()))
    }

    /// List tasks passing `filters`
    pub async fn list_tasks(&self, filters: &Filters) -> Result<Vec<Task>> {
        let guard = self.swarm.lock().await;
        guard.ensure_swarm()?;
        if !filters.is_active() {
            return Ok(guard.tasks.clone());
        }

        let mut tasks = Vec::new();
        for task in &guard.tasks {
            let service = guard
                .services
                .iter()
                .find(|s| s.id == task.service_id)
                .ok_or_else(|| SwarmError::ServiceNotFound(task.service_id.clone()))?;
            if filters.matches_task(task, service) {
                tasks.push(task.clone());
            }
        }
        Ok(tasks)
    }
}
