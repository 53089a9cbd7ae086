/// Key layout and encoding utilities for Fjall partitions
///
/// Partition structure:
/// - `requests`: req:{request_id} -> RequestRecord (JSON)
/// - `health`: health:{source_id}:{millis:016} -> HealthCheckRecord (JSON)
/// - `stats`: stats:{source_name} -> SourceStats (JSON)

/// Encode a request key: req:{request_id}
pub fn encode_request_key(request_id: &str) -> Vec<u8> {
    format!("req:{}", request_id).into_bytes()
}

/// Encode a health-check key: health:{source_id}:{millis:016}
pub fn encode_health_key(source_id: u32, millis: u64) -> Vec<u8> {
    format!("health:{}:{:016}", source_id, millis).into_bytes()
}

/// Encode a health prefix for range scan: health:{source_id}:
pub fn encode_health_prefix(source_id: u32) -> Vec<u8> {
    format!("health:{}:", source_id).into_bytes()
}

/// Decode a health key: health:{source_id}:{millis:016} -> (source_id, millis)
pub fn decode_health_key(key: &[u8]) -> Option<(u32, u64)> {
    let key_str = std::str::from_utf8(key).ok()?;
    let parts: Vec<&str> = key_str.strip_prefix("health:")?.split(':').collect();
    if parts.len() != 2 {
        return None;
    }
    let source_id = parts[0].parse().ok()?;
    let millis = parts[1].parse().ok()?;
    Some((source_id, millis))
}

/// Encode a stats key: stats:{source_name}
pub fn encode_stats_key(source_name: &str) -> Vec<u8> {
    format!("stats:{}", source_name).into_bytes()
}

/// Decode a stats key: stats:{source_name} -> source_name
pub fn decode_stats_key(key: &[u8]) -> Option<String> {
    let key_str = std::str::from_utf8(key).ok()?;
    key_str.strip_prefix("stats:").map(String::from)
}
