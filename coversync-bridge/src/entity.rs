use std::sync::Arc;

use coversync_api::{
    CallResponse, ClientError, DeviceDescriptor, ShutterConnector, ShutterDirection,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::coordinator::DeviceCoordinator;
use crate::error::BridgeError;
use crate::host::{CoverDeviceClass, CoverFeature, StatePublisher};

/// Host-visible state of one cover entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoverState {
    pub position: u8,
    pub closed: bool,
    pub opening: bool,
    pub closing: bool,
}

/// The closed set of commands a cover accepts.
///
/// Each variant maps to exactly one remote call; there is no dynamic
/// operation lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverCommand {
    Open,
    Close,
    SetPosition(u8),
    Stop,
}

impl CoverCommand {
    /// Remote operation name, used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Open | Self::Close | Self::SetPosition(_) => "set_position",
            Self::Stop => "stop_shutter",
        }
    }

    fn args(&self, index: usize) -> String {
        match self {
            Self::Open => format!("(100, {index})"),
            Self::Close => format!("(0, {index})"),
            Self::SetPosition(position) => format!("({position}, {index})"),
            Self::Stop => format!("({index})"),
        }
    }
}

enum CallOutcome {
    Success(CallResponse),
    Rejected(CallResponse),
    Transport(ClientError),
}

/// One cover entity, bound to a fixed segment of its device.
///
/// The cached state is recomputed from the coordinator snapshot on every
/// refresh notification and never hand-mutated; commands go out through a
/// fresh scoped session and leave the cached state alone.
pub struct CoverEntity {
    coordinator: Arc<DeviceCoordinator>,
    connector: Arc<dyn ShutterConnector>,
    publisher: Arc<dyn StatePublisher>,
    index: usize,
    unique_id: String,
    name: Option<String>,
    state: CoverState,
}

impl CoverEntity {
    pub(crate) fn new(
        coordinator: Arc<DeviceCoordinator>,
        connector: Arc<dyn ShutterConnector>,
        publisher: Arc<dyn StatePublisher>,
        index: usize,
        unique_id: String,
        name: Option<String>,
    ) -> Self {
        let mut entity = Self {
            coordinator,
            connector,
            publisher,
            index,
            unique_id,
            name,
            state: CoverState {
                position: 0,
                closed: true,
                opening: false,
                closing: false,
            },
        };
        entity.update_from_coordinator();
        entity
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Display label, `None` for the single cover of a one-segment device.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn segment_index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> CoverState {
        self.state
    }

    pub fn device_class(&self) -> CoverDeviceClass {
        CoverDeviceClass::Shutter
    }

    pub fn supported_features(&self) -> &'static [CoverFeature] {
        &[
            CoverFeature::Open,
            CoverFeature::Close,
            CoverFeature::SetPosition,
            CoverFeature::Stop,
        ]
    }

    /// Whether the device's last update (poll or command) succeeded.
    pub fn available(&self) -> bool {
        self.coordinator.last_update_success()
    }

    fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.unique_id)
    }

    /// Recompute the cached state from the latest snapshot.
    fn update_from_coordinator(&mut self) {
        let data = self.coordinator.data();
        let position = data.state.position.get(self.index).copied().unwrap_or(0);
        let direction = data
            .state
            .direction
            .get(self.index)
            .copied()
            .unwrap_or(ShutterDirection::Stop);
        self.state = CoverState {
            position,
            closed: position == 0,
            opening: direction == ShutterDirection::Up,
            closing: direction == ShutterDirection::Down,
        };
    }

    /// Handle one refresh notification from the coordinator.
    ///
    /// Recomputes the cached state, then hands it to the host; the
    /// recomputation always completes before the publish.
    pub fn handle_refresh(&mut self) {
        self.update_from_coordinator();
        self.publish_state();
    }

    fn publish_state(&self) {
        self.publisher.publish(&self.unique_id, &self.state);
    }

    pub async fn open(&mut self) -> Result<(), BridgeError> {
        self.invoke(CoverCommand::Open).await
    }

    pub async fn close(&mut self) -> Result<(), BridgeError> {
        self.invoke(CoverCommand::Close).await
    }

    /// Move the cover to `position`.
    ///
    /// The value is forwarded as given, even outside 0-100; the device owns
    /// range validation.
    pub async fn set_position(&mut self, position: u8) -> Result<(), BridgeError> {
        self.invoke(CoverCommand::SetPosition(position)).await
    }

    pub async fn stop(&mut self) -> Result<(), BridgeError> {
        self.invoke(CoverCommand::Stop).await
    }

    /// Dispatch one command as a single remote call.
    ///
    /// Any non-success outcome flips the device's shared availability flag,
    /// republishes the pre-command state, and surfaces one descriptive
    /// error. No retry happens at this layer.
    pub async fn invoke(&mut self, command: CoverCommand) -> Result<(), BridgeError> {
        debug!(
            entity = self.display_name(),
            command = command.name(),
            args = %command.args(self.index),
            "calling device api"
        );

        let descriptor = self.coordinator.data().descriptor.clone();
        let outcome = self.call_device(&descriptor, command).await;

        let detail = match outcome {
            CallOutcome::Success(_) => return Ok(()),
            CallOutcome::Rejected(response) => format!("{response:?}"),
            CallOutcome::Transport(error) => format!("{error:?}"),
        };

        self.coordinator.set_last_update_success(false);
        self.publish_state();

        let error = BridgeError::CommandFailed {
            entity: self.display_name().to_string(),
            command: command.name(),
            args: command.args(self.index),
            detail,
        };
        warn!(%error, "device command failed");
        Err(error)
    }

    /// Run one call over a fresh session.
    ///
    /// The session is released on every exit path: explicitly once the call
    /// resolves, through `Drop` if the future is cancelled mid-flight.
    async fn call_device(
        &self,
        descriptor: &DeviceDescriptor,
        command: CoverCommand,
    ) -> CallOutcome {
        let mut session = match self.connector.connect(descriptor).await {
            Ok(session) => session,
            Err(error) => return CallOutcome::Transport(error),
        };

        let result = match command {
            CoverCommand::Open => session.set_position(100, self.index).await,
            CoverCommand::Close => session.set_position(0, self.index).await,
            CoverCommand::SetPosition(position) => {
                session.set_position(position, self.index).await
            }
            CoverCommand::Stop => session.stop_shutter(self.index).await,
        };

        if let Err(error) = session.close().await {
            warn!(?error, "failed to release device session");
        }

        match result {
            Ok(response) if response.successful => CallOutcome::Success(response),
            Ok(response) => CallOutcome::Rejected(response),
            Err(error) => CallOutcome::Transport(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use coversync_api::{DeviceCategory, ShutterSession, ShutterState};
    use serde_json::json;

    use super::*;
    use crate::coordinator::CoordinatorData;

    #[derive(Clone, Copy)]
    enum Mode {
        Accept,
        Reject,
        FailConnect,
        FailCall,
    }

    struct ScriptedConnector {
        mode: StdMutex<Mode>,
        calls: Arc<StdMutex<Vec<String>>>,
        closes: Arc<AtomicUsize>,
    }

    impl ScriptedConnector {
        fn new(mode: Mode) -> Arc<Self> {
            Arc::new(Self {
                mode: StdMutex::new(mode),
                calls: Arc::new(StdMutex::new(Vec::new())),
                closes: Arc::new(AtomicUsize::new(0)),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn closes(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ShutterConnector for ScriptedConnector {
        async fn connect(
            &self,
            _descriptor: &DeviceDescriptor,
        ) -> Result<Box<dyn ShutterSession>, ClientError> {
            let mode = *self.mode.lock().unwrap();
            if let Mode::FailConnect = mode {
                return Err(ClientError::Timeout(Duration::from_secs(5)));
            }
            Ok(Box::new(ScriptedSession {
                mode,
                calls: self.calls.clone(),
                closes: self.closes.clone(),
            }))
        }
    }

    struct ScriptedSession {
        mode: Mode,
        calls: Arc<StdMutex<Vec<String>>>,
        closes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ShutterSession for ScriptedSession {
        async fn set_position(
            &mut self,
            position: u8,
            index: usize,
        ) -> Result<CallResponse, ClientError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("set_position({position}, {index})"));
            match self.mode {
                Mode::Reject => Ok(CallResponse::rejected(json!({"ok": false}))),
                Mode::FailCall => Err(ClientError::Timeout(Duration::from_secs(3))),
                _ => Ok(CallResponse::ok(json!({"ok": true}))),
            }
        }

        async fn stop_shutter(&mut self, index: usize) -> Result<CallResponse, ClientError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("stop_shutter({index})"));
            match self.mode {
                Mode::Reject => Ok(CallResponse::rejected(json!({"ok": false}))),
                Mode::FailCall => Err(ClientError::Timeout(Duration::from_secs(3))),
                _ => Ok(CallResponse::ok(json!({"ok": true}))),
            }
        }

        async fn close(self: Box<Self>) -> Result<(), ClientError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct TestPublisher {
        published: StdMutex<Vec<(String, CoverState)>>,
    }

    impl TestPublisher {
        fn published(&self) -> Vec<(String, CoverState)> {
            self.published.lock().unwrap().clone()
        }
    }

    impl StatePublisher for TestPublisher {
        fn publish(&self, entity_id: &str, state: &CoverState) {
            self.published
                .lock()
                .unwrap()
                .push((entity_id.to_string(), *state));
        }
    }

    fn coordinator_with(
        position: Vec<u8>,
        direction: Vec<ShutterDirection>,
    ) -> Arc<DeviceCoordinator> {
        let data = CoordinatorData {
            descriptor: DeviceDescriptor {
                category: DeviceCategory::Shutter,
                ip_address: "192.168.1.70".parse().unwrap(),
                device_id: "f2239a".to_string(),
                device_key: "18".to_string(),
                token: "token".to_string(),
            },
            state: ShutterState::new(position, direction),
        };
        Arc::new(DeviceCoordinator::new("f2239a", "A1:B2:C3:45:67:89", data))
    }

    fn entity(
        coordinator: &Arc<DeviceCoordinator>,
        connector: &Arc<ScriptedConnector>,
        publisher: &Arc<TestPublisher>,
        index: usize,
    ) -> CoverEntity {
        CoverEntity::new(
            coordinator.clone(),
            connector.clone() as Arc<dyn ShutterConnector>,
            publisher.clone() as Arc<dyn StatePublisher>,
            index,
            format!("f2239a-A1:B2:C3:45:67:89-{index}"),
            Some(format!("Cover {}", index + 1)),
        )
    }

    #[tokio::test]
    async fn commands_map_to_single_remote_calls() {
        let coordinator = coordinator_with(
            vec![50, 50],
            vec![ShutterDirection::Stop, ShutterDirection::Stop],
        );
        let connector = ScriptedConnector::new(Mode::Accept);
        let publisher = Arc::new(TestPublisher::default());
        let mut cover = entity(&coordinator, &connector, &publisher, 1);

        cover.open().await.unwrap();
        cover.close().await.unwrap();
        cover.set_position(37).await.unwrap();
        cover.stop().await.unwrap();

        assert_eq!(
            connector.calls(),
            vec![
                "set_position(100, 1)",
                "set_position(0, 1)",
                "set_position(37, 1)",
                "stop_shutter(1)",
            ]
        );
        // one fresh session per command, each released
        assert_eq!(connector.closes(), 4);
    }

    #[tokio::test]
    async fn set_position_is_not_clamped() {
        let coordinator = coordinator_with(vec![50], vec![ShutterDirection::Stop]);
        let connector = ScriptedConnector::new(Mode::Accept);
        let publisher = Arc::new(TestPublisher::default());
        let mut cover = entity(&coordinator, &connector, &publisher, 0);

        cover.set_position(150).await.unwrap();

        assert_eq!(connector.calls(), vec!["set_position(150, 0)"]);
    }

    #[tokio::test]
    async fn projection_tracks_snapshots() {
        let coordinator = coordinator_with(
            vec![0, 70],
            vec![ShutterDirection::Stop, ShutterDirection::Up],
        );
        let connector = ScriptedConnector::new(Mode::Accept);
        let publisher = Arc::new(TestPublisher::default());
        let mut cover = entity(&coordinator, &connector, &publisher, 1);

        assert_eq!(
            cover.state(),
            CoverState {
                position: 70,
                closed: false,
                opening: true,
                closing: false,
            }
        );

        let mut next = coordinator.data().as_ref().clone();
        next.state = ShutterState::new(
            vec![0, 40],
            vec![ShutterDirection::Stop, ShutterDirection::Down],
        );
        coordinator.publish(next);
        cover.handle_refresh();

        let state = cover.state();
        assert_eq!(state.position, 40);
        assert!(!state.closed);
        assert!(!state.opening);
        assert!(state.closing);
        assert!(!(state.opening && state.closing));

        let published = publisher.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].1, state);
    }

    #[test]
    fn state_serializes_for_host() {
        let state = CoverState {
            position: 70,
            closed: false,
            opening: true,
            closing: false,
        };
        assert_eq!(
            serde_json::to_value(state).unwrap(),
            json!({
                "position": 70,
                "closed": false,
                "opening": true,
                "closing": false,
            })
        );
    }

    #[tokio::test]
    async fn closed_only_at_zero_position() {
        let coordinator = coordinator_with(vec![0], vec![ShutterDirection::Stop]);
        let connector = ScriptedConnector::new(Mode::Accept);
        let publisher = Arc::new(TestPublisher::default());
        let cover = entity(&coordinator, &connector, &publisher, 0);

        assert!(cover.state().closed);
        assert_eq!(cover.state().position, 0);
    }

    #[tokio::test]
    async fn transport_failure_flags_device_and_republishes() {
        let coordinator = coordinator_with(vec![60], vec![ShutterDirection::Stop]);
        let connector = ScriptedConnector::new(Mode::FailConnect);
        let publisher = Arc::new(TestPublisher::default());
        let mut cover = entity(&coordinator, &connector, &publisher, 0);
        let before = cover.state();

        let error = cover.close().await.unwrap_err();

        let message = error.to_string();
        assert!(message.contains("Cover 1"));
        assert!(message.contains("set_position"));
        assert!(message.contains("(0, 0)"));

        assert!(!coordinator.last_update_success());
        assert_eq!(cover.state(), before);

        let published = publisher.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].1, before);

        // connection never opened, so nothing to release
        assert!(connector.calls().is_empty());
        assert_eq!(connector.closes(), 0);
    }

    #[tokio::test]
    async fn rejected_response_fails_like_a_timeout() {
        let coordinator = coordinator_with(vec![60], vec![ShutterDirection::Stop]);
        let connector = ScriptedConnector::new(Mode::Reject);
        let publisher = Arc::new(TestPublisher::default());
        let mut cover = entity(&coordinator, &connector, &publisher, 0);
        let before = cover.state();

        let error = cover.open().await.unwrap_err();

        assert!(error.to_string().contains("set_position"));
        assert!(!coordinator.last_update_success());
        assert_eq!(publisher.published(), vec![(cover.unique_id().to_string(), before)]);
        // the session was opened, so it must have been released
        assert_eq!(connector.closes(), 1);
    }

    #[tokio::test]
    async fn call_failure_after_connect_still_releases_session() {
        let coordinator = coordinator_with(vec![60], vec![ShutterDirection::Stop]);
        let connector = ScriptedConnector::new(Mode::FailCall);
        let publisher = Arc::new(TestPublisher::default());
        let mut cover = entity(&coordinator, &connector, &publisher, 0);

        assert!(cover.stop().await.is_err());

        assert_eq!(connector.calls(), vec!["stop_shutter(0)"]);
        assert_eq!(connector.closes(), 1);
        assert!(!coordinator.last_update_success());
    }

    #[tokio::test]
    async fn failure_is_visible_to_all_entities_of_the_device() {
        let coordinator = coordinator_with(
            vec![60, 60],
            vec![ShutterDirection::Stop, ShutterDirection::Stop],
        );
        let connector = ScriptedConnector::new(Mode::FailConnect);
        let publisher = Arc::new(TestPublisher::default());
        let mut commanded = entity(&coordinator, &connector, &publisher, 0);
        let sibling = entity(&coordinator, &connector, &publisher, 1);

        assert!(sibling.available());
        assert!(commanded.open().await.is_err());
        assert!(!sibling.available());
        assert!(!commanded.available());
    }

    #[tokio::test]
    async fn success_leaves_shared_flag_alone() {
        let coordinator = coordinator_with(vec![60], vec![ShutterDirection::Stop]);
        let connector = ScriptedConnector::new(Mode::Accept);
        let publisher = Arc::new(TestPublisher::default());
        let mut cover = entity(&coordinator, &connector, &publisher, 0);

        cover.open().await.unwrap();

        assert!(coordinator.last_update_success());
        // state updates arrive with the next poll, not from the command
        assert!(publisher.published().is_empty());
        assert_eq!(cover.state().position, 60);
    }

    #[tokio::test]
    async fn close_when_already_closed_still_calls_device() {
        let coordinator = coordinator_with(vec![0], vec![ShutterDirection::Stop]);
        let connector = ScriptedConnector::new(Mode::Accept);
        let publisher = Arc::new(TestPublisher::default());
        let mut cover = entity(&coordinator, &connector, &publisher, 0);

        assert!(cover.state().closed);
        cover.close().await.unwrap();

        assert_eq!(connector.calls(), vec!["set_position(0, 0)"]);
    }
}
