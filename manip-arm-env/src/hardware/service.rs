//! Request/response protocol of the arm service.
use crate::{error::ArmEnvError, types::Pose};
use anyhow::Result;
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use log::{trace, warn};
use nalgebra::Vector3;
use std::time::Duration;

/// Requests accepted by the arm service.
#[derive(Debug, Clone, PartialEq)]
pub enum ArmRequest {
    /// Availability probe.
    Ping,

    /// Current end-effector pose.
    GetEePose,

    /// Current end-effector orientation as roll, pitch and yaw.
    GetEeOrientation,

    /// Moves the arm to joint positions.
    SetJointPositions(Vec<f32>),

    /// Moves the end effector to an absolute pose.
    SetEePose(Pose),

    /// Moves the end effector by a displacement, keeping its orientation.
    SetEePoseRelative(Vector3<f32>),

    /// Opens the gripper.
    OpenGripper,

    /// Closes the gripper.
    CloseGripper,

    /// Resets and activates the gripper.
    ResetGripper,
}

/// Responses of the arm service.
#[derive(Debug, Clone, PartialEq)]
pub enum ArmResponse {
    /// Answer to [`ArmRequest::Ping`].
    Pong,

    /// Answer to [`ArmRequest::GetEePose`].
    EePose(Pose),

    /// Answer to [`ArmRequest::GetEeOrientation`].
    EeOrientation(Vector3<f32>),

    /// Completion of a command, with its success flag.
    Done(bool),

    /// The service failed to handle the request.
    Error(String),
}

/// A request in flight, as received by the service side.
#[derive(Debug)]
pub struct ArmCall {
    /// The request.
    pub request: ArmRequest,
    reply: Sender<ArmResponse>,
}

impl ArmCall {
    /// Sends the response. Returns `false` if the caller has given up waiting.
    pub fn respond(self, response: ArmResponse) -> bool {
        self.reply.send(response).is_ok()
    }
}

/// Creates the channel between [`ArmServiceClient`]s and a service.
pub fn arm_service_channel() -> (Sender<ArmCall>, Receiver<ArmCall>) {
    unbounded()
}

/// Client of the arm service.
///
/// Every call waits at most `timeout` for the response and fails with
/// [`ArmEnvError::ServiceUnavailable`] otherwise, after `retries` further attempts.
#[derive(Debug, Clone)]
pub struct ArmServiceClient {
    calls: Sender<ArmCall>,
    timeout: Duration,
    retries: usize,
}

impl ArmServiceClient {
    /// Constructs a client.
    pub fn new(calls: Sender<ArmCall>, timeout: Duration, retries: usize) -> Self {
        Self {
            calls,
            timeout,
            retries,
        }
    }

    fn call_once(&self, request: &ArmRequest, timeout: Duration) -> Result<ArmResponse> {
        let (reply, response) = bounded(1);
        let call = ArmCall {
            request: request.clone(),
            reply,
        };
        if self.calls.send(call).is_err() {
            return Err(ArmEnvError::ServiceUnavailable("arm service disconnected".into()).into());
        }

        match response.recv_timeout(timeout) {
            Ok(ArmResponse::Error(msg)) => {
                let msg = format!("{:?} failed: {}", request, msg);
                Err(ArmEnvError::ServiceUnavailable(msg).into())
            }
            Ok(response) => Ok(response),
            Err(RecvTimeoutError::Timeout) => Err(ArmEnvError::ServiceUnavailable(format!(
                "{:?} timed out after {:?}",
                request, timeout
            ))
            .into()),
            Err(RecvTimeoutError::Disconnected) => Err(ArmEnvError::ServiceUnavailable(format!(
                "{:?} dropped without response",
                request
            ))
            .into()),
        }
    }

    /// Sends a request and waits for the response.
    pub fn call(&self, request: ArmRequest) -> Result<ArmResponse> {
        trace!("arm service call: {:?}", request);
        let mut attempt = 0;
        loop {
            match self.call_once(&request, self.timeout) {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    warn!("{}, retrying ({}/{})", e, attempt, self.retries);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Polls the service with [`ArmRequest::Ping`] until it answers.
    ///
    /// Each attempt waits at most `attempt_timeout`. Fails with
    /// [`ArmEnvError::ServiceUnavailable`] after `max_attempts` attempts.
    pub fn wait_for_service(&self, attempt_timeout: Duration, max_attempts: usize) -> Result<()> {
        for attempt in 1..=max_attempts {
            match self.call_once(&ArmRequest::Ping, attempt_timeout) {
                Ok(_) => return Ok(()),
                Err(e) => warn!("Arm service not ready yet ({}/{}): {}", attempt, max_attempts, e),
            }
        }
        Err(ArmEnvError::ServiceUnavailable(format!(
            "no answer after {} attempts",
            max_attempts
        ))
        .into())
    }

    fn expect_done(&self, request: ArmRequest) -> Result<bool> {
        match self.call(request)? {
            ArmResponse::Done(ok) => Ok(ok),
            r => Err(unexpected(r)),
        }
    }

    /// Current end-effector pose.
    pub fn ee_pose(&self) -> Result<Pose> {
        match self.call(ArmRequest::GetEePose)? {
            ArmResponse::EePose(pose) => Ok(pose),
            r => Err(unexpected(r)),
        }
    }

    /// Current end-effector orientation as roll, pitch and yaw.
    pub fn ee_orientation(&self) -> Result<Vector3<f32>> {
        match self.call(ArmRequest::GetEeOrientation)? {
            ArmResponse::EeOrientation(rpy) => Ok(rpy),
            r => Err(unexpected(r)),
        }
    }

    /// Moves the arm to joint positions.
    pub fn set_joint_positions(&self, positions: &[f32]) -> Result<bool> {
        self.expect_done(ArmRequest::SetJointPositions(positions.to_vec()))
    }

    /// Moves the end effector to an absolute pose.
    pub fn set_ee_pose(&self, pose: &Pose) -> Result<bool> {
        self.expect_done(ArmRequest::SetEePose(*pose))
    }

    /// Moves the end effector by a displacement.
    pub fn set_ee_pose_relative(&self, delta: &Vector3<f32>) -> Result<bool> {
        self.expect_done(ArmRequest::SetEePoseRelative(*delta))
    }

    /// Opens the gripper.
    pub fn open_gripper(&self) -> Result<bool> {
        self.expect_done(ArmRequest::OpenGripper)
    }

    /// Closes the gripper.
    pub fn close_gripper(&self) -> Result<bool> {
        self.expect_done(ArmRequest::CloseGripper)
    }

    /// Resets and activates the gripper.
    pub fn reset_gripper(&self) -> Result<bool> {
        self.expect_done(ArmRequest::ResetGripper)
    }
}

fn unexpected(response: ArmResponse) -> anyhow::Error {
    ArmEnvError::ServiceUnavailable(format!("unexpected response {:?}", response)).into()
}
