// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The release descriptor: the self-contained, hashable record describing
//! a deploy, with its canonical object-store layout.

use crate::lock::Locker;
use chrono::{DateTime, Duration, Utc};
use relay_cloud::{arn, get_sha256, get_struct, put_struct, CloudClients};
use relay_core::digest;
use relay_core::StateError;
use relay_machine::Machine;
use serde::{Deserialize, Serialize};

/// Releases older than this are rejected.
const MAX_RELEASE_AGE_HOURS: i64 = 5;
/// Releases dated further in the future than this are rejected.
const MAX_RELEASE_SKEW_MINUTES: i64 = 10;
/// Halt markers older than this are ignored.
const HALT_FRESH_MINUTES: i64 = 5;

const DEPLOY_WITH_TAG: &str = "step-deployer";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Release {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_table_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lambda_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lambda_sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_fn_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_machine_json: Option<String>,

    // Server-derived; anything the client sends here is wiped on entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,

    /// Written at `$.error` by the deployer's catchers; rides along with
    /// the descriptor so clients can read the failure off the last output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ReleaseError>,
}

/// A halt marker stored at `<root_dir>/halt`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct HaltMarker {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// The record written to `<release_dir>/log` after a deploy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployLog {
    pub release_id: Option<String>,
    pub uuid: Option<String>,
    pub success: bool,
    pub at: DateTime<Utc>,
}

/// The `{Error, Cause}` payload a catcher records on the failure path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseError {
    #[serde(rename = "Error", default)]
    pub error: String,
    #[serde(rename = "Cause", default)]
    pub cause: String,
}

relay_core::builder! {
    pub struct ReleaseBuilder => Release {
        option {
            aws_region: String = None,
            aws_account_id: String = None,
            release_id: String = Some("release-1".to_string()),
            created_at: DateTime<Utc> = Some(Utc::now()),
            project_name: String = Some("project".to_string()),
            config_name: String = Some("development".to_string()),
            bucket: String = Some("bucket".to_string()),
            lock_table_name: String = None,
            lambda_name: String = Some("lambdaname".to_string()),
            lambda_sha256: String = None,
            step_fn_name: String = Some("stepfnname".to_string()),
            state_machine_json: String = Some(relay_machine::EMPTY_STATE_MACHINE.to_string()),
            uuid: String = None,
            release_sha256: String = None,
            success: bool = None,
            error: ReleaseError = None,
        }
    }
}

impl Release {
    //////
    // Canonical object-store layout
    //////

    pub fn project_dir(&self) -> String {
        format!("{}/{}", self.account(), self.project())
    }

    pub fn root_dir(&self) -> String {
        format!("{}/{}", self.project_dir(), self.config())
    }

    pub fn release_dir(&self) -> String {
        format!("{}/{}", self.root_dir(), self.field(&self.release_id))
    }

    pub fn release_path(&self) -> String {
        format!("{}/release", self.release_dir())
    }

    pub fn log_path(&self) -> String {
        format!("{}/log", self.release_dir())
    }

    pub fn root_lock_path(&self) -> String {
        format!("{}/lock", self.root_dir())
    }

    pub fn release_lock_path(&self) -> String {
        format!("{}/lock", self.release_dir())
    }

    pub fn lambda_zip_path(&self) -> String {
        format!("{}/lambda.zip", self.release_dir())
    }

    pub fn lambda_arn(&self) -> String {
        arn::lambda_arn(&self.region(), &self.account(), self.field(&self.lambda_name))
    }

    pub fn step_arn(&self) -> String {
        arn::step_arn(&self.region(), &self.account(), self.field(&self.step_fn_name))
    }

    fn field<'a>(&self, value: &'a Option<String>) -> &'a str {
        value.as_deref().unwrap_or_default()
    }

    fn region(&self) -> String {
        self.field(&self.aws_region).to_string()
    }

    fn account(&self) -> String {
        self.field(&self.aws_account_id).to_string()
    }

    fn project(&self) -> String {
        self.field(&self.project_name).to_string()
    }

    fn config(&self) -> String {
        self.field(&self.config_name).to_string()
    }

    //////
    // Defaulting and fingerprinting
    //////

    /// Clear every server-derived field the client may have set.
    pub fn wipe_volatile(&mut self) {
        self.uuid = None;
        self.release_sha256 = None;
        self.success = None;
        self.error = None;
    }

    /// Fill blank attributes: region/account from the invocation context,
    /// a fresh lock uuid, and derived bucket/lock-table names.
    pub fn set_defaults(&mut self, region: &str, account: &str) {
        if self.aws_region.is_none() && !region.is_empty() {
            self.aws_region = Some(region.to_string());
        }
        if self.aws_account_id.is_none() && !account.is_empty() {
            self.aws_account_id = Some(account.to_string());
        }
        if self.uuid.is_none() {
            self.uuid = Some(uuid::Uuid::new_v4().to_string());
        }
        if self.lock_table_name.is_none() {
            self.lock_table_name = Some(format!("{}-locks", self.field(&self.lambda_name)));
        }
        if self.bucket.is_none() {
            self.bucket = Some(format!("{}-step-deployer", self.account()));
        }
    }

    /// SHA-256 of the canonical serialization with volatile fields cleared.
    ///
    /// Client and deployer compute this over the same bytes, so tampering
    /// with the descriptor in flight is detectable against the stored copy.
    pub fn fingerprint(&self) -> Result<String, StateError> {
        let mut canonical = self.clone();
        canonical.wipe_volatile();
        digest::sha256_json(&canonical).map_err(|e| StateError::bad_release(e.to_string()))
    }

    //////
    // Validation
    //////

    /// Structural validation of the descriptor itself.
    pub fn validate_attributes(&self, now: DateTime<Utc>) -> Result<(), StateError> {
        let required = [
            ("AwsRegion", &self.aws_region),
            ("AwsAccountID", &self.aws_account_id),
            ("ReleaseId", &self.release_id),
            ("ProjectName", &self.project_name),
            ("ConfigName", &self.config_name),
            ("Bucket", &self.bucket),
            ("LockTableName", &self.lock_table_name),
            ("LambdaName", &self.lambda_name),
            ("LambdaSHA256", &self.lambda_sha256),
            ("StepFnName", &self.step_fn_name),
            ("StateMachineJSON", &self.state_machine_json),
        ];
        for (label, value) in required {
            if self.field(value).is_empty() {
                return Err(StateError::bad_release(format!("{label} must be defined")));
            }
        }

        let Some(created_at) = self.created_at else {
            return Err(StateError::bad_release("CreatedAt must be defined"));
        };
        if created_at < now - Duration::hours(MAX_RELEASE_AGE_HOURS) {
            return Err(StateError::bad_release(format!(
                "CreatedAt: release is older than {MAX_RELEASE_AGE_HOURS} hours"
            )));
        }
        if created_at > now + Duration::minutes(MAX_RELEASE_SKEW_MINUTES) {
            return Err(StateError::bad_release(
                "CreatedAt: release is dated in the future",
            ));
        }

        if let Some(definition) = &self.state_machine_json {
            Machine::validate_json(definition).map_err(|e| {
                StateError::bad_release(format!("StateMachineJSON invalid with '{e}'"))
            })?;
        }

        Ok(())
    }

    /// The copy uploaded alongside the artifacts must hash to the same
    /// fingerprint as the descriptor the deployer received.
    pub async fn validate_stored_release(&self, clients: &CloudClients) -> Result<(), StateError> {
        let stored: Release =
            get_struct(clients.store.as_ref(), self.field(&self.bucket), &self.release_path())
                .await
                .map_err(|e| {
                    StateError::bad_release(format!("uploaded Release record invalid: {e}"))
                })?;

        let stored_fingerprint = stored.fingerprint()?;
        if Some(&stored_fingerprint) != self.release_sha256.as_ref() {
            return Err(StateError::bad_release(format!(
                "Release SHA mismatch, expecting {:?}, got {stored_fingerprint}",
                self.release_sha256
            )));
        }
        Ok(())
    }

    /// The uploaded code artifact must match the descriptor's digest.
    pub async fn validate_zip_digest(&self, clients: &CloudClients) -> Result<(), StateError> {
        let sha =
            get_sha256(clients.store.as_ref(), self.field(&self.bucket), &self.lambda_zip_path())
                .await
                .map_err(|e| StateError::bad_release(e.to_string()))?;

        if Some(&sha) != self.lambda_sha256.as_ref() {
            return Err(StateError::bad_release(format!(
                "Lambda SHA mismatch, expecting {:?}, got {sha}",
                self.lambda_sha256
            )));
        }
        Ok(())
    }

    /// The target function and workflow must belong to this project/config.
    pub async fn validate_resources(&self, clients: &CloudClients) -> Result<(), StateError> {
        let tags = clients
            .functions
            .list_tags(&self.lambda_arn())
            .await
            .map_err(|e| StateError::bad_release(e.to_string()))?;

        let expectations = [
            ("ProjectName", self.project()),
            ("ConfigName", self.config()),
            ("DeployWith", DEPLOY_WITH_TAG.to_string()),
        ];
        for (tag, expected) in expectations {
            match tags.get(tag) {
                Some(actual) if *actual == expected => {}
                Some(actual) => {
                    return Err(StateError::bad_release(format!(
                        "Lambda {tag} tag incorrect, expecting {expected} has {actual}"
                    )));
                }
                None => {
                    return Err(StateError::bad_release(format!("Lambda {tag} tag is unset")));
                }
            }
        }

        let details = clients
            .workflows
            .describe_state_machine(&self.step_arn())
            .await
            .map_err(|e| StateError::bad_release(e.to_string()))?;

        let path = arn::role_path(&details.role_arn);
        let expected = format!("/step/{}/{}/", self.project(), self.config());
        if path != expected {
            return Err(StateError::bad_release(format!(
                "Incorrect Step Function Role Path, expecting {expected}, got {path}"
            )));
        }

        Ok(())
    }

    //////
    // Deploy actions
    //////

    /// Push the workflow definition. Failing here leaves the remote state
    /// untouched, so callers classify it as a clean failure.
    pub async fn deploy_state_machine(&self, clients: &CloudClients) -> Result<(), StateError> {
        let definition = self
            .state_machine_json
            .as_deref()
            .ok_or_else(|| StateError::deploy_sfn("StateMachineJSON must be defined"))?;

        clients
            .workflows
            .update_state_machine(&self.step_arn(), definition)
            .await
            .map_err(|e| StateError::deploy_sfn(e.to_string()))
    }

    /// Fetch the uploaded zip and push it to the function plane.
    pub async fn deploy_function_code(&self, clients: &CloudClients) -> Result<(), StateError> {
        let zip = clients
            .store
            .get(self.field(&self.bucket), &self.lambda_zip_path())
            .await
            .map_err(|e| StateError::deploy_lambda(e.to_string()))?;

        clients
            .functions
            .update_function_code(&self.lambda_arn(), &zip)
            .await
            .map_err(|e| StateError::deploy_lambda(e.to_string()))
    }

    //////
    // Halt marker and deploy log
    //////

    pub fn halt_path(&self) -> String {
        format!("{}/halt", self.root_dir())
    }

    /// Drop a halt marker so in-flight deploys for this project/config stop.
    pub async fn halt(&self, clients: &CloudClients, message: &str) -> Result<(), StateError> {
        let marker = HaltMarker { message: Some(message.to_string()) };
        put_struct(clients.store.as_ref(), self.field(&self.bucket), &self.halt_path(), &marker)
            .await
            .map_err(|e| StateError::bad_release(e.to_string()))
    }

    pub async fn clear_halt(&self, clients: &CloudClients) -> Result<(), StateError> {
        clients
            .store
            .delete(self.field(&self.bucket), &self.halt_path())
            .await
            .map_err(|e| StateError::bad_release(e.to_string()))
    }

    /// The active halt message, if a fresh marker exists. Stale markers
    /// (older than five minutes) are ignored rather than wedging deploys.
    pub async fn halt_message(
        &self,
        clients: &CloudClients,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, StateError> {
        let bucket = self.field(&self.bucket);
        let marker =
            match get_struct::<HaltMarker>(clients.store.as_ref(), bucket, &self.halt_path()).await
            {
                Ok(marker) => marker,
                Err(err) if err.is_not_found() => return Ok(None),
                Err(err) => return Err(StateError::bad_release(err.to_string())),
            };

        let modified = clients
            .store
            .last_modified(bucket, &self.halt_path())
            .await
            .map_err(|e| StateError::bad_release(e.to_string()))?;
        if modified < now - Duration::minutes(HALT_FRESH_MINUTES) {
            return Ok(None);
        }

        Ok(Some(marker.message.unwrap_or_default()))
    }

    /// Record the deploy outcome at the release's log path.
    pub async fn write_log(&self, clients: &CloudClients, at: DateTime<Utc>) -> Result<(), StateError> {
        let entry = DeployLog {
            release_id: self.release_id.clone(),
            uuid: self.uuid.clone(),
            success: self.success.unwrap_or_default(),
            at,
        };
        put_struct(clients.store.as_ref(), self.field(&self.bucket), &self.log_path(), &entry)
            .await
            .map_err(|e| StateError::bad_release(e.to_string()))
    }

    //////
    // Locking
    //////

    /// Take the root lock for this `(account, project, config)`.
    pub async fn grab_lock(&self, locker: &dyn Locker) -> Result<bool, crate::lock::LockerError> {
        locker
            .grab_lock(
                self.field(&self.lock_table_name),
                &self.root_lock_path(),
                self.field(&self.uuid),
                &format!("deploying {}", self.field(&self.release_id)),
            )
            .await
    }

    pub async fn release_lock(&self, locker: &dyn Locker) -> Result<(), crate::lock::LockerError> {
        locker
            .release_lock(
                self.field(&self.lock_table_name),
                &self.root_lock_path(),
                self.field(&self.uuid),
            )
            .await
    }
}

#[cfg(test)]
#[path = "release_tests.rs"]
mod tests;
