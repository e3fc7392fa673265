//! Scripted in-memory [`DropletApi`] for tests.

use chrono::{TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use crate::digitalocean::{
    Action, ActionStatus, ApiFailure, ApiResult, Droplet, DropletApi, DropletStatus, Snapshot,
    StopMethod,
};

const NOT_FOUND: &str = "The resource you were accessing could not be found.";

/// One recorded remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Droplet(u64),
    Droplets,
    PowerState(u64),
    PowerOn(u64),
    PowerOff(u64, StopMethod),
    Snapshot(u64, String),
    Action(u64),
    DeleteImage(u64),
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<ApiCall>,
    power_states: HashMap<u64, VecDeque<DropletStatus>>,
    statuses: HashMap<u64, DropletStatus>,
    actions: HashMap<u64, (Action, VecDeque<ActionStatus>)>,
    next_action_id: u64,
}

/// Answers from a fixed script and records every call it receives.
///
/// Power-state and action-status scripts are consumed one entry per query;
/// the last entry sticks. Without a power-state script a droplet reports its
/// seeded status, updated by every accepted power-on or power-off.
#[derive(Debug, Default)]
pub struct MockDropletApi {
    droplets: Vec<Droplet>,
    fetch_failures: HashMap<u64, String>,
    list_failure: Option<String>,
    power_on_failures: HashMap<u64, String>,
    power_off_failures: HashMap<u64, String>,
    snapshot_failures: HashMap<u64, String>,
    action_script: Vec<ActionStatus>,
    delete_results: HashMap<u64, ApiResult<bool>>,
    state: Mutex<MockState>,
}

impl MockDropletApi {
    pub fn new() -> Self {
        Self {
            action_script: vec![ActionStatus::Completed],
            state: Mutex::new(MockState {
                next_action_id: 36804636,
                ..MockState::default()
            }),
            ..Self::default()
        }
    }

    pub fn with_droplet(mut self, droplet: Droplet) -> Self {
        self.droplets.retain(|d| d.id != droplet.id);
        self.droplets.push(droplet);
        self
    }

    pub fn fail_fetch(mut self, droplet_id: u64, message: &str) -> Self {
        self.fetch_failures.insert(droplet_id, message.to_string());
        self
    }

    pub fn fail_list(mut self, message: &str) -> Self {
        self.list_failure = Some(message.to_string());
        self
    }

    pub fn fail_power_on(mut self, droplet_id: u64, message: &str) -> Self {
        self.power_on_failures.insert(droplet_id, message.to_string());
        self
    }

    pub fn fail_power_off(mut self, droplet_id: u64, message: &str) -> Self {
        self.power_off_failures
            .insert(droplet_id, message.to_string());
        self
    }

    pub fn fail_snapshot(mut self, droplet_id: u64, message: &str) -> Self {
        self.snapshot_failures
            .insert(droplet_id, message.to_string());
        self
    }

    /// Statuses successive power-state queries report for `droplet_id`.
    pub fn power_states(self, droplet_id: u64, statuses: &[DropletStatus]) -> Self {
        self.lock()
            .power_states
            .insert(droplet_id, statuses.iter().copied().collect());
        self
    }

    /// Statuses every newly created action reports on successive queries.
    pub fn action_states(mut self, statuses: &[ActionStatus]) -> Self {
        self.action_script = statuses.to_vec();
        self
    }

    pub fn delete_result(mut self, image_id: u64, result: ApiResult<bool>) -> Self {
        self.delete_results.insert(image_id, result);
        self
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    pub fn count(&self, matches: impl Fn(&ApiCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| matches(c)).count()
    }

    pub fn deleted_images(&self) -> Vec<u64> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                ApiCall::DeleteImage(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: ApiCall) {
        self.lock().calls.push(call);
    }

    fn find(&self, droplet_id: u64) -> ApiResult<&Droplet> {
        self.droplets
            .iter()
            .find(|d| d.id == droplet_id)
            .ok_or_else(|| ApiFailure::with_status(404, NOT_FOUND))
    }

    fn status_of(&self, droplet: &Droplet) -> DropletStatus {
        self.lock()
            .statuses
            .get(&droplet.id)
            .copied()
            .unwrap_or(droplet.status)
    }

    fn set_status(&self, droplet_id: u64, status: DropletStatus) {
        self.lock().statuses.insert(droplet_id, status);
    }

    fn start_action(&self, droplet_id: u64, kind: &str) -> ApiResult<Action> {
        self.find(droplet_id)?;
        let mut state = self.lock();
        let id = state.next_action_id;
        state.next_action_id += 1;

        let action = Action {
            id,
            status: ActionStatus::InProgress,
            kind: kind.to_string(),
            resource_id: Some(droplet_id),
        };
        state
            .actions
            .insert(id, (action.clone(), self.action_script.iter().copied().collect()));
        Ok(action)
    }
}

fn pop_sticky<T: Copy>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().copied()
    }
}

impl DropletApi for MockDropletApi {
    fn droplet(&self, droplet_id: u64) -> ApiResult<Droplet> {
        self.record(ApiCall::Droplet(droplet_id));
        if let Some(message) = self.fetch_failures.get(&droplet_id) {
            return Err(ApiFailure::with_status(404, message.clone()));
        }
        let mut droplet = self.find(droplet_id)?.clone();
        droplet.status = self.status_of(&droplet);
        Ok(droplet)
    }

    fn droplets(&self) -> ApiResult<Vec<Droplet>> {
        self.record(ApiCall::Droplets);
        if let Some(message) = &self.list_failure {
            return Err(ApiFailure::with_status(500, message.clone()));
        }
        Ok(self
            .droplets
            .iter()
            .cloned()
            .map(|mut droplet| {
                droplet.status = self.status_of(&droplet);
                droplet.snapshots.clear();
                droplet
            })
            .collect())
    }

    fn power_state(&self, droplet_id: u64) -> ApiResult<DropletStatus> {
        self.record(ApiCall::PowerState(droplet_id));
        if let Some(message) = self.fetch_failures.get(&droplet_id) {
            return Err(ApiFailure::with_status(404, message.clone()));
        }
        let fallback = self.status_of(self.find(droplet_id)?);
        let mut state = self.lock();
        Ok(state
            .power_states
            .get_mut(&droplet_id)
            .and_then(pop_sticky)
            .unwrap_or(fallback))
    }

    fn power_on(&self, droplet_id: u64) -> ApiResult<Action> {
        self.record(ApiCall::PowerOn(droplet_id));
        if let Some(message) = self.power_on_failures.get(&droplet_id) {
            return Err(ApiFailure::with_status(422, message.clone()));
        }
        let action = self.start_action(droplet_id, "power_on")?;
        self.set_status(droplet_id, DropletStatus::Active);
        Ok(action)
    }

    fn power_off(&self, droplet_id: u64, method: StopMethod) -> ApiResult<Action> {
        self.record(ApiCall::PowerOff(droplet_id, method));
        if let Some(message) = self.power_off_failures.get(&droplet_id) {
            return Err(ApiFailure::with_status(422, message.clone()));
        }
        let action = self.start_action(droplet_id, method.action_type())?;
        self.set_status(droplet_id, DropletStatus::Off);
        Ok(action)
    }

    fn snapshot(&self, droplet_id: u64, name: &str) -> ApiResult<Action> {
        self.record(ApiCall::Snapshot(droplet_id, name.to_string()));
        if let Some(message) = self.snapshot_failures.get(&droplet_id) {
            return Err(ApiFailure::with_status(422, message.clone()));
        }
        self.start_action(droplet_id, "snapshot")
    }

    fn action(&self, action_id: u64) -> ApiResult<Action> {
        self.record(ApiCall::Action(action_id));
        let mut state = self.lock();
        let (action, script) = state
            .actions
            .get_mut(&action_id)
            .ok_or_else(|| ApiFailure::with_status(404, NOT_FOUND))?;
        if let Some(status) = pop_sticky(script) {
            action.status = status;
        }
        Ok(action.clone())
    }

    fn delete_image(&self, image_id: u64) -> ApiResult<bool> {
        self.record(ApiCall::DeleteImage(image_id));
        self.delete_results
            .get(&image_id)
            .cloned()
            .unwrap_or(Ok(true))
    }
}

/// Droplet 100823 "mrcr.ru" with three snapshots, newest first.
pub fn sample_droplet(status: DropletStatus) -> Droplet {
    let at = |day| Utc.with_ymd_and_hms(2014, 7, day, 3, 0, 0).single();
    let snapshot = |id, name: &str, day| Snapshot {
        id,
        name: name.to_string(),
        created_at: at(day).unwrap_or_default(),
    };

    Droplet {
        id: 100823,
        name: "mrcr.ru".to_string(),
        status,
        snapshot_ids: vec![5019903, 5019770, 5019566],
        snapshots: vec![
            snapshot(5019903, "mrcr.ru_2014_07_21", 21),
            snapshot(5019770, "mrcr.ru_2014_07_19", 19),
            snapshot(5019566, "mrcr.ru_2014_07_17", 17),
        ],
    }
}
