//! Encoding options and resource-pool capabilities.

use std::sync::{Arc, OnceLock};

use crate::encoder::Encoder;
use crate::scheme::{default_time_schemes, MarkerScheme, TimeSchemes};

/// Supplies reusable byte buffers.
///
/// `get` must return an empty (possibly pre-allocated) buffer; `put` must
/// tolerate zero-length returns. Implementations synchronize internally.
pub trait BytesPool: Send + Sync {
    /// Fetches a buffer with at least the requested capacity.
    fn get(&self, capacity: usize) -> Vec<u8>;

    /// Returns a buffer for reuse.
    fn put(&self, bytes: Vec<u8>);
}

/// Accepts closed encoders for later reuse via [`Encoder::reset`].
pub trait EncoderPool: Send + Sync {
    /// Returns an encoder for reuse.
    fn put(&self, encoder: Encoder);
}

/// Immutable bundle of schemes and pool capabilities.
///
/// Every mutator returns a new independent bundle; the original is never
/// modified. [`Options::new`] hands out a shared default bundle, so cloning
/// and mutating it is cheap.
#[derive(Clone)]
pub struct Options {
    time_schemes: Arc<TimeSchemes>,
    marker_scheme: Arc<MarkerScheme>,
    bytes_pool: Option<Arc<dyn BytesPool>>,
    encoder_pool: Option<Arc<dyn EncoderPool>>,
}

impl Options {
    /// Returns the shared default bundle.
    #[must_use]
    pub fn new() -> Self {
        static DEFAULT: OnceLock<Options> = OnceLock::new();
        DEFAULT
            .get_or_init(|| Options {
                time_schemes: Arc::new(default_time_schemes()),
                marker_scheme: Arc::new(MarkerScheme::default()),
                bytes_pool: None,
                encoder_pool: None,
            })
            .clone()
    }

    /// Replaces the time encoding scheme table.
    #[must_use]
    pub fn with_time_schemes(mut self, schemes: TimeSchemes) -> Self {
        self.time_schemes = Arc::new(schemes);
        self
    }

    /// Replaces the marker encoding scheme.
    #[must_use]
    pub fn with_marker_scheme(mut self, scheme: MarkerScheme) -> Self {
        self.marker_scheme = Arc::new(scheme);
        self
    }

    /// Installs a bytes pool.
    #[must_use]
    pub fn with_bytes_pool(mut self, pool: Arc<dyn BytesPool>) -> Self {
        self.bytes_pool = Some(pool);
        self
    }

    /// Installs an encoder pool.
    #[must_use]
    pub fn with_encoder_pool(mut self, pool: Arc<dyn EncoderPool>) -> Self {
        self.encoder_pool = Some(pool);
        self
    }

    /// The time encoding scheme table.
    #[inline]
    #[must_use]
    pub fn time_schemes(&self) -> &Arc<TimeSchemes> {
        &self.time_schemes
    }

    /// The marker encoding scheme.
    #[inline]
    #[must_use]
    pub fn marker_scheme(&self) -> &Arc<MarkerScheme> {
        &self.marker_scheme
    }

    /// The bytes pool, if any.
    #[inline]
    #[must_use]
    pub fn bytes_pool(&self) -> Option<&Arc<dyn BytesPool>> {
        self.bytes_pool.as_ref()
    }

    /// The encoder pool, if any.
    #[inline]
    #[must_use]
    pub fn encoder_pool(&self) -> Option<&Arc<dyn EncoderPool>> {
        self.encoder_pool.as_ref()
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}
