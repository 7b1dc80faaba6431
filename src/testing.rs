//! In-memory adapters shared by command tests.

use std::collections::HashMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::context::ServiceContext;
use crate::model::{DirectoryEntry, MemberId, Role, RoleId};
use crate::ports::directory::{DirectoryFuture, DirectorySource};
use crate::ports::filesystem::FileSystem;
use crate::ports::grants::{GrantExecutor, GrantFuture};

#[derive(Default)]
pub struct MemFs {
    files: Mutex<HashMap<PathBuf, String>>,
}

impl MemFs {
    pub fn with_files(files: &[(&str, &str)]) -> Arc<Self> {
        let fs = Self::default();
        for (path, contents) in files {
            fs.files.lock().unwrap().insert(PathBuf::from(path), (*contents).to_string());
        }
        Arc::new(fs)
    }
}

impl FileSystem for MemFs {
    fn read_to_string(&self, path: &Path) -> Result<String, Box<dyn Error + Send + Sync>> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| format!("File not found: {}", path.display()).into())
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.files.lock().unwrap().insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().keys().any(|p| p.starts_with(path))
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>, Box<dyn Error + Send + Sync>> {
        let files = self.files.lock().unwrap();
        Ok(files
            .keys()
            .filter(|p| p.parent() == Some(path))
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect())
    }
}

/// A guild with fixed members and roles that accepts every grant.
pub struct FakeGuild {
    members: Vec<DirectoryEntry>,
    roles: Vec<Role>,
    pub granted: Mutex<Vec<(MemberId, RoleId)>>,
}

impl FakeGuild {
    pub fn new(members: Vec<DirectoryEntry>) -> Arc<Self> {
        Arc::new(Self {
            members,
            roles: vec![
                Role { id: RoleId(7), name: "Scholar".into() },
                Role { id: RoleId(8), name: "Mentor".into() },
            ],
            granted: Mutex::new(Vec::new()),
        })
    }

    pub fn grant_count(&self) -> usize {
        self.granted.lock().unwrap().len()
    }
}

impl DirectorySource for FakeGuild {
    fn fetch_members(&self) -> DirectoryFuture<'_, Vec<DirectoryEntry>> {
        Box::pin(async { Ok(self.members.clone()) })
    }

    fn fetch_roles(&self) -> DirectoryFuture<'_, Vec<Role>> {
        Box::pin(async { Ok(self.roles.clone()) })
    }
}

impl GrantExecutor for FakeGuild {
    fn grant<'a>(&'a self, member: &'a MemberId, role: RoleId) -> GrantFuture<'a> {
        self.granted.lock().unwrap().push((member.clone(), role));
        Box::pin(async { Ok(()) })
    }
}

/// Offline context over `fs` and `guild`.
pub fn context(fs: &Arc<MemFs>, guild: &Arc<FakeGuild>) -> ServiceContext {
    let mut ctx = ServiceContext::offline().with_platform(guild.clone(), guild.clone());
    ctx.fs = fs.clone();
    ctx
}
