//! Switching to an unprivileged identity after the listener is bound.

use grimm_core::{IdSpec, Permissions};
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum PrivilegeError {
    #[error("Unknown group: {0}")]
    UnknownGroup(String),
    #[error("Unknown user: {0}")]
    UnknownUser(String),
    #[error("setgid({id}) failed: {source}")]
    SetGid {
        id: u32,
        #[source]
        source: std::io::Error,
    },
    #[error("setuid({id}) failed: {source}")]
    SetUid {
        id: u32,
        #[source]
        source: std::io::Error,
    },
    #[error("Process would keep running as root")]
    StillRoot,
    #[error("Privilege dropping is not supported on this platform")]
    Unsupported,
    #[error("Account lookup failed: {0}")]
    Lookup(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity {
    pub uid: u32,
    pub gid: u32,
}

impl Identity {
    pub fn is_root(&self) -> bool {
        self.uid == 0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User ID: {}, Group ID: {}", self.uid, self.gid)
    }
}

/// Process identity control.
pub trait PrivilegeDrop: Send + Sync {
    fn current(&self) -> Identity;

    /// Switches to `permissions` (group first, then user) and returns the
    /// resulting identity. Refuses to leave the process running as root.
    fn drop_to(&self, permissions: Option<&Permissions>) -> Result<Identity, PrivilegeError>;
}

/// The real process identity.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPrivileges;

#[cfg(unix)]
mod system {
    use super::*;
    use nix::unistd::{getgid, getuid, setgid, setuid, Gid, Group, Uid, User};

    fn group_id(spec: &IdSpec) -> Result<u32, PrivilegeError> {
        if let Some(id) = spec.as_id() {
            return Ok(id);
        }
        match Group::from_name(&spec.to_string()) {
            Ok(Some(group)) => Ok(group.gid.as_raw()),
            Ok(None) => Err(PrivilegeError::UnknownGroup(spec.to_string())),
            Err(e) => Err(PrivilegeError::Lookup(e.to_string())),
        }
    }

    fn user_id(spec: &IdSpec) -> Result<u32, PrivilegeError> {
        if let Some(id) = spec.as_id() {
            return Ok(id);
        }
        match User::from_name(&spec.to_string()) {
            Ok(Some(user)) => Ok(user.uid.as_raw()),
            Ok(None) => Err(PrivilegeError::UnknownUser(spec.to_string())),
            Err(e) => Err(PrivilegeError::Lookup(e.to_string())),
        }
    }

    impl PrivilegeDrop for SystemPrivileges {
        fn current(&self) -> Identity {
            Identity {
                uid: getuid().as_raw(),
                gid: getgid().as_raw(),
            }
        }

        fn drop_to(&self, permissions: Option<&Permissions>) -> Result<Identity, PrivilegeError> {
            let Some(permissions) = permissions else {
                let current = self.current();
                return if current.is_root() {
                    Err(PrivilegeError::StillRoot)
                } else {
                    Ok(current)
                };
            };

            let gid = group_id(&permissions.group)?;
            let uid = user_id(&permissions.user)?;

            setgid(Gid::from_raw(gid)).map_err(|errno| PrivilegeError::SetGid {
                id: gid,
                source: errno.into(),
            })?;
            setuid(Uid::from_raw(uid)).map_err(|errno| PrivilegeError::SetUid {
                id: uid,
                source: errno.into(),
            })?;

            let after = self.current();
            if after.is_root() {
                return Err(PrivilegeError::StillRoot);
            }
            Ok(after)
        }
    }
}

#[cfg(not(unix))]
impl PrivilegeDrop for SystemPrivileges {
    fn current(&self) -> Identity {
        Identity::default()
    }

    fn drop_to(&self, permissions: Option<&Permissions>) -> Result<Identity, PrivilegeError> {
        match permissions {
            Some(_) => Err(PrivilegeError::Unsupported),
            None => Ok(self.current()),
        }
    }
}
