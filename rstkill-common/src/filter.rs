/// BPF clause matching only segments without SYN, FIN or RST set, i.e. data and
/// ack segments of connections that are already established.
pub const NO_CONTROL_SEGMENTS: &str = "tcp[tcpflags] & (tcp-syn|tcp-fin|tcp-rst) == 0";

/// Build the filter installed on the capture from the operator's expression.
///
/// Setup and teardown segments are always excluded, so a RST is never raced
/// against a handshake or a close that is already in progress.
pub fn effective_filter(operator: Option<&str>) -> String {
    match operator.map(str::trim) {
        Some(expr) if !expr.is_empty() => format!("({}) and ({})", expr, NO_CONTROL_SEGMENTS),
        _ => NO_CONTROL_SEGMENTS.to_string(),
    }
}
