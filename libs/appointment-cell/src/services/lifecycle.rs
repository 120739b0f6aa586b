// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus};

/// Who is asking for a status change, relative to the appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requester {
    Admin,
    Owner,
    Other,
}

pub struct AppointmentLifecycleService;

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed. Keeping the current
    /// status is always accepted.
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if current_status == new_status {
            return Ok(());
        }

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Pending => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Confirmed => vec![AppointmentStatus::Cancelled],
            // Terminal
            AppointmentStatus::Cancelled => vec![],
        }
    }

    /// Confirming is for admins; cancelling also for the patient who owns it.
    pub fn authorize_transition(
        &self,
        requester: Requester,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        let allowed = match new_status {
            AppointmentStatus::Confirmed | AppointmentStatus::Pending => requester == Requester::Admin,
            AppointmentStatus::Cancelled => matches!(requester, Requester::Admin | Requester::Owner),
        };

        if allowed {
            Ok(())
        } else {
            Err(AppointmentError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AppointmentStatus::*;

    #[test]
    fn test_transition_table() {
        let lifecycle = AppointmentLifecycleService::new();

        assert!(lifecycle.validate_status_transition(Pending, Confirmed).is_ok());
        assert!(lifecycle.validate_status_transition(Pending, Cancelled).is_ok());
        assert!(lifecycle.validate_status_transition(Confirmed, Cancelled).is_ok());
        assert!(lifecycle.validate_status_transition(Confirmed, Pending).is_err());
    }

    #[test]
    fn test_cancelled_is_terminal() {
        let lifecycle = AppointmentLifecycleService::new();

        for next in [Pending, Confirmed] {
            assert!(matches!(
                lifecycle.validate_status_transition(Cancelled, next),
                Err(AppointmentError::InvalidStatusTransition { from: Cancelled, .. })
            ));
        }
        assert!(lifecycle.get_valid_transitions(Cancelled).is_empty());
    }

    #[test]
    fn test_only_admins_confirm() {
        let lifecycle = AppointmentLifecycleService::new();

        assert!(lifecycle.authorize_transition(Requester::Admin, Confirmed).is_ok());
        assert!(lifecycle.authorize_transition(Requester::Owner, Confirmed).is_err());
        assert!(lifecycle.authorize_transition(Requester::Owner, Cancelled).is_ok());
        assert!(lifecycle.authorize_transition(Requester::Other, Cancelled).is_err());
    }
}
