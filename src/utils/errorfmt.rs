use std::{
    error::Error,
    fmt::{Display, Formatter},
};

/// Formats an error together with its chain of sources, separated by `: `.
pub struct ErrorFmt<E>(pub E);

impl<E: Error> Display for ErrorFmt<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(e) = source {
            write!(f, ": {}", e)?;
            source = e.source();
        }
        Ok(())
    }
}
