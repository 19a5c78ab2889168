use crate::HealthRes;

/// Liveness answer for the relay's `/health` route.
#[derive(Clone, Copy)]
pub struct HealthService;

impl HealthService {
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Valuation relay is alive".into(),
        }
    }
}
