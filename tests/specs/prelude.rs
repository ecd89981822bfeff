// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the integration specs.

pub use relay_cloud::MemoryClients;
pub use relay_core::digest::sha256_hex;
pub use relay_core::ErrorKind;
pub use relay_deployer::{Release, TableLocker};
pub use relay_machine::{Execution, Machine};
pub use serde_json::{json, Value};
pub use std::sync::Arc;

pub const LOCK_TABLE: &str = "lambdaname-locks";
pub const ROOT_LOCK_KEY: &str = "account/project/development/lock";

/// A deployer machine wired to in-memory backends, plus the fixtures a
/// healthy deploy of `release-1` expects.
pub struct DeployerFixture {
    pub memory: MemoryClients,
    pub machine: Machine,
    pub release: Release,
}

pub fn deployer_fixture() -> DeployerFixture {
    let memory = MemoryClients::new();
    let clients = memory.clients();

    let mut release = Release::builder()
        .aws_region("region")
        .aws_account_id("account")
        .lock_table_name(LOCK_TABLE)
        .build();

    // Tags and role path the resource validation expects
    memory.functions.set_tag("ProjectName", "project");
    memory.functions.set_tag("ConfigName", "development");
    memory.functions.set_tag("DeployWith", "step-deployer");
    memory.workflows.set_role_arn(
        &release.step_arn(),
        "arn:aws:iam::0000000000:role/step/project/development/role-name",
    );

    // The uploaded artifacts a client deploy would have left behind
    memory.store.seed("bucket", &release.lambda_zip_path(), b"lambda_zip".to_vec());
    release.lambda_sha256 = Some(sha256_hex(b"lambda_zip"));
    let stored = serde_json::to_vec(&release).unwrap_or_default();
    memory.store.seed("bucket", &release.release_path(), stored);

    let locker = Arc::new(TableLocker::new(clients.lock_table.clone()));
    let machine = relay_deployer::deployer_machine_with_handlers(&clients, locker)
        .unwrap_or_else(|e| panic!("deployer machine: {e}"));

    DeployerFixture { memory, machine, release }
}

impl DeployerFixture {
    pub async fn run(&self) -> Execution {
        let input = serde_json::to_value(&self.release).unwrap_or(Value::Null);
        self.machine.execute(input).await
    }

    pub fn lock_rows(&self) -> usize {
        self.memory.lock_table.row_count(LOCK_TABLE)
    }

    pub fn lock_grabs(&self) -> Vec<(String, String, String)> {
        self.memory.lock_table.puts()
    }

    pub fn lock_releases(&self) -> Vec<(String, String, String)> {
        self.memory.lock_table.deletes()
    }
}
