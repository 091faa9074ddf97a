//! Media transport capability.
//!
//! The core never touches a decoder or a video element directly; it
//! drives whatever playback backend sits behind this trait. Backends
//! are built per source locator and report position/duration through
//! `inspect`.

/// Playback position and media duration, both in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportStatus {
    pub position: f64,
    pub duration: f64,
}

/// External playback backend for one media source.
pub trait MediaTransport {
    fn play(&mut self);
    fn pause(&mut self);
    /// Hard seek to an absolute position in seconds.
    fn seek(&mut self, secs: f64);
    fn set_rate(&mut self, rate: f64);
    fn set_muted(&mut self, muted: bool);
    /// Current position/duration, or `None` while the media is still
    /// loading.
    fn inspect(&self) -> Option<TransportStatus>;
}

/// Builds a transport for a source locator plus its access token.
pub trait TransportFactory {
    fn open(&self, locator: &str, token: &str) -> Box<dyn MediaTransport>;
}

/// Transport that plays nothing. Backs headless runs and slots whose
/// backend has not been wired up.
#[derive(Debug, Default)]
pub struct NullTransport;

impl MediaTransport for NullTransport {
    fn play(&mut self) {}
    fn pause(&mut self) {}
    fn seek(&mut self, _secs: f64) {}
    fn set_rate(&mut self, _rate: f64) {}
    fn set_muted(&mut self, _muted: bool) {}
    fn inspect(&self) -> Option<TransportStatus> {
        None
    }
}

/// Factory producing [`NullTransport`]s.
#[derive(Debug, Default)]
pub struct NullTransportFactory;

impl TransportFactory for NullTransportFactory {
    fn open(&self, _locator: &str, _token: &str) -> Box<dyn MediaTransport> {
        Box::new(NullTransport)
    }
}
