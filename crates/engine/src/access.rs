//! Session tokens and project membership
//!
//! Credential storage is out of scope: the engine only needs to map a token to
//! a user and answer whether a user belongs to a project.

use std::collections::{HashMap, HashSet};

use eventsync_core::{Error, ProjectId, Result, UserId};
use parking_lot::RwLock;

/// Resolves tokens and project memberships
pub trait AccessDirectory: Send + Sync {
    /// Resolve a session token to its user
    fn authenticate(&self, token: &str) -> Result<UserId>;

    /// Check that `user` is a member of `project`
    ///
    /// Unknown projects fail with `ProjectNotFound` before membership is
    /// considered.
    fn authorize(&self, user: &UserId, project: ProjectId) -> Result<()>;
}

/// In-memory directory seeded from configuration
#[derive(Debug, Default)]
pub struct StaticDirectory {
    sessions: RwLock<HashMap<String, UserId>>,
    projects: RwLock<HashMap<ProjectId, HashSet<UserId>>>,
}

impl StaticDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from `(token, user)` and `(project, members)` pairs
    pub fn from_entries(
        sessions: impl IntoIterator<Item = (String, UserId)>,
        projects: impl IntoIterator<Item = (ProjectId, Vec<UserId>)>,
    ) -> Self {
        let directory = Self::new();
        for (token, user) in sessions {
            directory.add_session(token, user);
        }
        for (project, members) in projects {
            directory.add_project(project, members);
        }
        directory
    }

    /// Register a session token
    pub fn add_session(&self, token: impl Into<String>, user: UserId) {
        self.sessions.write().insert(token.into(), user);
    }

    /// Register a project with its members, replacing any previous membership
    pub fn add_project(&self, project: ProjectId, members: impl IntoIterator<Item = UserId>) {
        self.projects
            .write()
            .insert(project, members.into_iter().collect());
    }
}

impl AccessDirectory for StaticDirectory {
    fn authenticate(&self, token: &str) -> Result<UserId> {
        self.sessions
            .read()
            .get(token)
            .cloned()
            .ok_or(Error::Unauthenticated)
    }

    fn authorize(&self, user: &UserId, project: ProjectId) -> Result<()> {
        let projects = self.projects.read();
        let members = projects
            .get(&project)
            .ok_or(Error::ProjectNotFound(project))?;
        if members.contains(user) {
            Ok(())
        } else {
            Err(Error::Forbidden {
                user: user.clone(),
                project,
            })
        }
    }
}
