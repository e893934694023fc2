//! # Engine Primitives
//!
//! Fixed defaults and lookup constants for the kubegraph engine.
//!
//! These values mirror Kubernetes API defaults where one exists; they are
//! compiled in and immutable at runtime.

/// Namespace assigned to resources that do not declare one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Deployment replica count when `spec.replicas` is absent.
pub const DEFAULT_REPLICAS: i64 = 1;

/// Service type when `spec.type` is absent.
pub const DEFAULT_SERVICE_TYPE: &str = "ClusterIP";

/// Service port when a port entry omits `port`.
pub const DEFAULT_SERVICE_PORT: i64 = 80;

/// Service port protocol when omitted.
pub const DEFAULT_PROTOCOL: &str = "TCP";

/// Icon tag for kinds without a dedicated icon.
pub const DEFAULT_ICON: &str = "default";

/// Default visual box size.
pub const DEFAULT_VISUAL_SIZE: f64 = 80.0;

// =============================================================================
// PORT BOUNDS
// =============================================================================

/// Lowest valid TCP/UDP port number.
pub const MIN_PORT: i64 = 1;

/// Highest valid TCP/UDP port number.
pub const MAX_PORT: i64 = 65535;

// =============================================================================
// API VERSIONS
// =============================================================================

pub const API_APPS_V1: &str = "apps/v1";
pub const API_BATCH_V1: &str = "batch/v1";
pub const API_NETWORKING_V1: &str = "networking.k8s.io/v1";
pub const API_CORE_V1: &str = "v1";
