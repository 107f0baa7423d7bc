use {
    std::{
        error::Error,
        fmt::{Display, Formatter},
    },
    uapi::{Errno, c},
};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct OsError(pub c::c_int);

impl From<Errno> for OsError {
    fn from(e: Errno) -> Self {
        Self(e.0)
    }
}

impl From<std::io::Error> for OsError {
    fn from(v: std::io::Error) -> Self {
        Self(v.raw_os_error().unwrap_or(c::EINVAL))
    }
}

impl Error for OsError {}

impl Display for OsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let msg = std::io::Error::from_raw_os_error(self.0);
        write!(f, "{} (os error {})", msg.kind(), self.0)
    }
}
