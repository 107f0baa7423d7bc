use {
    crate::utils::oserror::OsError,
    log::{Level, Log, Metadata, Record},
    std::{
        cell::RefCell,
        io::Write,
        sync::{
            Arc,
            atomic::{AtomicU32, Ordering::Relaxed},
        },
        time::SystemTime,
    },
    thiserror::Error,
    uapi::{Fd, OwnedFd},
};


thread_local! {
    static BUFFER: RefCell<Vec<u8>> = const { RefCell::new(Vec::new()) };
}

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Could not dup stderr")]
    DupStderr(#[source] OsError),
    #[error("Another logger is already installed")]
    AlreadyInstalled(#[source] log::SetLoggerError),
}

pub struct Logger {
    level: AtomicU32,
    file: OwnedFd,
}

impl Logger {
    pub fn install_stderr(level: Level) -> Result<Arc<Self>, LoggerError> {
        let file = match uapi::fcntl_dupfd_cloexec(2, 0) {
            Ok(fd) => fd,
            Err(e) => return Err(LoggerError::DupStderr(e.into())),
        };
        Self::install(level, file)
    }

    fn install(level: Level, file: OwnedFd) -> Result<Arc<Self>, LoggerError> {
        let slf = Arc::new(Self {
            level: AtomicU32::new(level as _),
            file,
        });
        log::set_boxed_logger(Box::new(LogWrapper {
            logger: slf.clone(),
        }))
        .map_err(LoggerError::AlreadyInstalled)?;
        log::set_max_level(level.to_level_filter());
        Ok(slf)
    }

    pub fn set_level(&self, level: Level) {
        self.level.store(level as _, Relaxed);
        log::set_max_level(level.to_level_filter());
    }
}

fn format_record(buffer: &mut Vec<u8>, now: SystemTime, record: &Record) {
    let _ = if let Some(mp) = record.module_path() {
        writeln!(
            buffer,
            "[{} {:5} {}] {}",
            humantime::format_rfc3339_millis(now),
            record.level(),
            mp,
            record.args(),
        )
    } else {
        writeln!(
            buffer,
            "[{} {:5}] {}",
            humantime::format_rfc3339_millis(now),
            record.level(),
            record.args(),
        )
    };
}

struct LogWrapper {
    logger: Arc<Logger>,
}

impl Log for LogWrapper {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() as u32 <= self.logger.level.load(Relaxed)
    }

    fn log(&self, record: &Record) {
        if record.level() as u32 > self.logger.level.load(Relaxed) {
            return;
        }
        BUFFER.with_borrow_mut(|buffer| {
            buffer.clear();
            format_record(buffer, SystemTime::now(), record);
            let mut fd = Fd::new(self.logger.file.raw());
            let _ = fd.write_all(buffer);
        });
    }

    fn flush(&self) {
        // nothing
    }
}
