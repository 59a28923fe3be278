/// `GET /healthz` (§6.1). Unauthenticated liveness probe.
pub async fn healthz() -> &'static str {
    "ok"
}
