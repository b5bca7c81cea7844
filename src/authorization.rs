//! Per-resource access policy.
//!
//! All ownership and role checks that the route handlers need are
//! collected here as one principal + action decision table. Rules are
//! checked in order with a default deny, so a handler can never grant
//! access by forgetting a branch.

use uuid::Uuid;

use crate::models::enums::Role;

/// The authenticated caller, reduced to what policy decisions need.
#[derive(Debug, Clone, Copy)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

/// A guarded operation, carrying the ownership facts of the target
/// resource rather than the resource itself.
#[derive(Debug, Clone, Copy)]
pub enum Action {
    /// Read one appointment.
    ViewAppointment { patient_id: Uuid, doctor_id: Uuid },
    /// Update notes on, or delete, one appointment.
    ModifyAppointment { patient_id: Uuid, doctor_id: Uuid },
    /// Change an appointment's status.
    SetAppointmentStatus { doctor_id: Uuid },
    /// Move an appointment to a new slot.
    RescheduleAppointment { patient_id: Uuid },
    /// Read one user record.
    ViewUser { target_id: Uuid },
    /// Update or delete one user record.
    ModifyUser { target_id: Uuid },
    /// Read a patient's consultations or prescriptions.
    ViewPatientRecords { patient_id: Uuid },
    /// List the appointments assigned to a doctor.
    ViewDoctorAppointments { doctor_id: Uuid },
    /// Read a patient's health record on their behalf.
    ViewPatientHealth,
}

/// Why access was granted or refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessReason {
    /// Caller is an admin.
    Admin,
    /// Caller is the resource's owning patient or the target user.
    Owner,
    /// Caller is the doctor assigned to the resource.
    AssignedDoctor,
    /// Caller holds a clinical role (doctor or admin).
    ClinicalRole,
    /// No matching rule.
    Denied,
}

/// Result of a policy check.
#[derive(Debug, Clone, Copy)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: AccessReason,
}

impl AccessDecision {
    fn allow(reason: AccessReason) -> Self {
        Self {
            allowed: true,
            reason,
        }
    }

    fn deny() -> Self {
        Self {
            allowed: false,
            reason: AccessReason::Denied,
        }
    }
}

/// Decide whether the principal may perform the action.
pub fn check_access(principal: &Principal, action: Action) -> AccessDecision {
    match action {
        Action::ViewAppointment {
            patient_id,
            doctor_id,
        }
        | Action::ModifyAppointment {
            patient_id,
            doctor_id,
        } => {
            if principal.role == Role::Admin {
                return AccessDecision::allow(AccessReason::Admin);
            }
            if principal.role == Role::Patient && principal.id == patient_id {
                return AccessDecision::allow(AccessReason::Owner);
            }
            if principal.role == Role::Doctor && principal.id == doctor_id {
                return AccessDecision::allow(AccessReason::AssignedDoctor);
            }
            AccessDecision::deny()
        }

        Action::SetAppointmentStatus { doctor_id } => {
            if principal.role == Role::Admin {
                return AccessDecision::allow(AccessReason::Admin);
            }
            if principal.role == Role::Doctor && principal.id == doctor_id {
                return AccessDecision::allow(AccessReason::AssignedDoctor);
            }
            AccessDecision::deny()
        }

        Action::RescheduleAppointment { patient_id } => {
            if principal.role == Role::Patient && principal.id == patient_id {
                return AccessDecision::allow(AccessReason::Owner);
            }
            AccessDecision::deny()
        }

        Action::ViewUser { target_id } | Action::ModifyUser { target_id } => {
            if principal.role == Role::Admin {
                return AccessDecision::allow(AccessReason::Admin);
            }
            if principal.id == target_id {
                return AccessDecision::allow(AccessReason::Owner);
            }
            AccessDecision::deny()
        }

        Action::ViewPatientRecords { patient_id } => {
            if matches!(principal.role, Role::Doctor | Role::Admin) {
                return AccessDecision::allow(AccessReason::ClinicalRole);
            }
            if principal.id == patient_id {
                return AccessDecision::allow(AccessReason::Owner);
            }
            AccessDecision::deny()
        }

        Action::ViewDoctorAppointments { doctor_id } => {
            if principal.role == Role::Admin {
                return AccessDecision::allow(AccessReason::Admin);
            }
            if principal.role == Role::Doctor && principal.id == doctor_id {
                return AccessDecision::allow(AccessReason::Owner);
            }
            AccessDecision::deny()
        }

        Action::ViewPatientHealth => {
            if matches!(principal.role, Role::Doctor | Role::Admin) {
                return AccessDecision::allow(AccessReason::ClinicalRole);
            }
            AccessDecision::deny()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn admin_can_view_any_appointment() {
        let admin = principal(Role::Admin);
        let decision = check_access(
            &admin,
            Action::ViewAppointment {
                patient_id: Uuid::new_v4(),
                doctor_id: Uuid::new_v4(),
            },
        );
        assert!(decision.allowed);
        assert_eq!(decision.reason, AccessReason::Admin);
    }

    #[test]
    fn patient_sees_only_own_appointment() {
        let patient = principal(Role::Patient);
        let doctor_id = Uuid::new_v4();

        let own = check_access(
            &patient,
            Action::ViewAppointment {
                patient_id: patient.id,
                doctor_id,
            },
        );
        assert!(own.allowed);
        assert_eq!(own.reason, AccessReason::Owner);

        let other = check_access(
            &patient,
            Action::ViewAppointment {
                patient_id: Uuid::new_v4(),
                doctor_id,
            },
        );
        assert!(!other.allowed);
    }

    #[test]
    fn unassigned_doctor_cannot_set_status() {
        let doctor = principal(Role::Doctor);
        let assigned = check_access(
            &doctor,
            Action::SetAppointmentStatus {
                doctor_id: doctor.id,
            },
        );
        assert!(assigned.allowed);
        assert_eq!(assigned.reason, AccessReason::AssignedDoctor);

        let unassigned = check_access(
            &doctor,
            Action::SetAppointmentStatus {
                doctor_id: Uuid::new_v4(),
            },
        );
        assert!(!unassigned.allowed);
    }

    #[test]
    fn reschedule_is_owning_patient_only() {
        let patient = principal(Role::Patient);
        assert!(
            check_access(
                &patient,
                Action::RescheduleAppointment {
                    patient_id: patient.id
                }
            )
            .allowed
        );

        let admin = principal(Role::Admin);
        assert!(
            !check_access(
                &admin,
                Action::RescheduleAppointment {
                    patient_id: Uuid::new_v4()
                }
            )
            .allowed,
            "Even admins do not reschedule on a patient's behalf"
        );
    }

    #[test]
    fn user_records_are_self_or_admin() {
        let patient = principal(Role::Patient);
        assert!(
            check_access(
                &patient,
                Action::ViewUser {
                    target_id: patient.id
                }
            )
            .allowed
        );
        assert!(
            !check_access(
                &patient,
                Action::ModifyUser {
                    target_id: Uuid::new_v4()
                }
            )
            .allowed
        );
        assert!(
            check_access(
                &principal(Role::Admin),
                Action::ModifyUser {
                    target_id: Uuid::new_v4()
                }
            )
            .allowed
        );
    }

    #[test]
    fn any_doctor_may_read_patient_records() {
        let doctor = principal(Role::Doctor);
        let decision = check_access(
            &doctor,
            Action::ViewPatientRecords {
                patient_id: Uuid::new_v4(),
            },
        );
        assert!(decision.allowed);
        assert_eq!(decision.reason, AccessReason::ClinicalRole);
    }

    #[test]
    fn patient_cannot_read_another_patients_records() {
        let patient = principal(Role::Patient);
        assert!(
            !check_access(
                &patient,
                Action::ViewPatientRecords {
                    patient_id: Uuid::new_v4()
                }
            )
            .allowed
        );
        assert!(!check_access(&patient, Action::ViewPatientHealth).allowed);
    }

    #[test]
    fn doctor_appointment_list_is_self_or_admin() {
        let doctor = principal(Role::Doctor);
        assert!(
            check_access(
                &doctor,
                Action::ViewDoctorAppointments {
                    doctor_id: doctor.id
                }
            )
            .allowed
        );
        assert!(
            !check_access(
                &doctor,
                Action::ViewDoctorAppointments {
                    doctor_id: Uuid::new_v4()
                }
            )
            .allowed
        );
    }
}
