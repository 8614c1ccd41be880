//! External Collaborators
//!
//! Deployment and authentication are owned by other systems and reach the
//! crate only through these traits; no implementation ships here.
//!
//! A [`Deployer`] attached to the runtime context receives the files of every
//! persisted artifact (see [`extract_files`]). [`Authenticator`] is left for
//! embedders that front the workflow with their own request handling.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentInfo {
    pub url: String,
}

/// Deploys generated files, keyed by relative path
#[async_trait]
pub trait Deployer: Send + Sync {
    async fn deploy(&self, files: &BTreeMap<String, String>) -> Result<DeploymentInfo>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthIdentity {
    pub valid: bool,
    pub identity: Option<String>,
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthIdentity>;
}

pub type SharedDeployer = Arc<dyn Deployer + Send + Sync>;
pub type SharedAuthenticator = Arc<dyn Authenticator + Send + Sync>;

/// Split a synthesized artifact into files.
///
/// Fenced blocks whose info string carries a path (` ```rust src/main.rs `)
/// become one file each; unnamed blocks are numbered `snippet_N.txt`.
pub fn extract_files(artifact: &str) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    let mut current: Option<(String, Vec<&str>)> = None;
    let mut unnamed = 0;

    for line in artifact.lines() {
        let trimmed = line.trim_start();
        match current.take() {
            Some((path, body)) if trimmed.starts_with("```") => {
                files.insert(path, body.join("\n"));
            }
            Some((path, mut body)) => {
                body.push(line);
                current = Some((path, body));
            }
            None => {
                if let Some(info) = trimmed.strip_prefix("```") {
                    let path = info
                        .split_whitespace()
                        .nth(1)
                        .map(String::from)
                        .unwrap_or_else(|| {
                            unnamed += 1;
                            format!("snippet_{}.txt", unnamed)
                        });
                    current = Some((path, Vec::new()));
                }
            }
        }
    }

    files
}
