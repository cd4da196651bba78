/// Port the receiver listens on when neither the config nor `ATON_PORT` says otherwise.
pub const DEFAULT_PORT: u16 = 9201;
pub const PORT_ENV_VAR: &str = "ATON_PORT";

pub const MAX_AOV_NAME_LEN: usize = 4096;
/// Upper bound on `bucket_w * bucket_h * samples_per_pixel` accepted from the wire.
pub const MAX_BUCKET_SAMPLES: usize = 1 << 28;
/// Largest `width * height` an `OpenImage` may announce.
pub const MAX_IMAGE_AREA: i64 = 1 << 30;

pub const BYTES_PER_MB: i64 = 1024 * 1024;
