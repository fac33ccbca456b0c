//! Order lifecycle rules.
//!
//! Every mutation an order can undergo after checkout is a method on
//! [`Order`] that either applies the change in memory or returns an
//! [`OrderError`] leaving the order untouched. Callers load the order,
//! call one of these methods, persist the result, and notify.

use chrono::{DateTime, Utc};

use super::Order;
use super::otp::{OtpCode, PendingOtp};
use crate::types::{OrderStatus, UserId, UserRole};

/// Reasons an order mutation is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("Order not found")]
    NotFound,

    /// The acting courier is not the one assigned to the order.
    #[error("Not authorized for this order")]
    NotAssigned,

    #[error("Use OTP flow to mark as delivered")]
    DeliveredRequiresOtp,

    #[error("Order is already {0}")]
    AlreadyFinal(OrderStatus),

    #[error("OTP is required")]
    OtpRequired,

    #[error("No OTP generated for this order")]
    NoOtp,

    #[error("OTP expired")]
    OtpExpired,

    #[error("Invalid OTP")]
    OtpMismatch,

    #[error("User is not a delivery user")]
    NotACourier,
}

/// Who is asking for a status change.
///
/// The courier surface is restricted to the assigned courier, cannot set
/// `delivered` (that only happens through [`Order::verify_otp`]) and cannot
/// move an order out of a terminal status. The admin surface may set any
/// status, including `delivered`, and does not mark the OTP as verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSurface {
    Courier(UserId),
    Admin,
}

impl Order {
    /// Ensure `courier` is the courier assigned to this order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotAssigned` when no courier is assigned or a
    /// different one is.
    pub fn ensure_assigned(&self, courier: UserId) -> Result<(), OrderError> {
        match self.courier {
            Some(assigned) if assigned == courier => Ok(()),
            _ => Err(OrderError::NotAssigned),
        }
    }

    /// Change the status on behalf of `surface`.
    ///
    /// # Errors
    ///
    /// On the courier surface: `NotAssigned`, then `DeliveredRequiresOtp`
    /// for `delivered`, then `AlreadyFinal` when the order is delivered or
    /// cancelled. The admin surface never fails.
    pub fn set_status(
        &mut self,
        status: OrderStatus,
        surface: StatusSurface,
    ) -> Result<(), OrderError> {
        if let StatusSurface::Courier(courier) = surface {
            self.ensure_assigned(courier)?;
            if status == OrderStatus::Delivered {
                return Err(OrderError::DeliveredRequiresOtp);
            }
            if self.status.is_terminal() {
                return Err(OrderError::AlreadyFinal(self.status));
            }
        }
        self.status = status;
        Ok(())
    }

    /// Assign a courier, or clear the assignment with `None`.
    ///
    /// The candidate is passed with its stored role.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotACourier` if the candidate's role is not
    /// courier; the current assignment is kept.
    pub fn assign_courier(&mut self, candidate: Option<(UserId, UserRole)>) -> Result<(), OrderError> {
        match candidate {
            Some((_, role)) if role != UserRole::Courier => Err(OrderError::NotACourier),
            Some((id, _)) => {
                self.courier = Some(id);
                Ok(())
            }
            None => {
                self.courier = None;
                Ok(())
            }
        }
    }

    /// Issue a fresh delivery code, replacing any previous one.
    ///
    /// Returns the code so the caller can send it to the purchaser.
    ///
    /// # Errors
    ///
    /// `NotAssigned` for a courier other than the assigned one, and
    /// `AlreadyFinal` for delivered or cancelled orders.
    pub fn issue_otp(&mut self, courier: UserId, now: DateTime<Utc>) -> Result<OtpCode, OrderError> {
        self.ensure_assigned(courier)?;
        if self.status.is_terminal() {
            return Err(OrderError::AlreadyFinal(self.status));
        }
        let otp = PendingOtp::issue(now);
        let code = otp.code.clone();
        self.otp = Some(otp);
        self.otp_verified = false;
        Ok(code)
    }

    /// Check a submitted code and, if it matches, finish the delivery.
    ///
    /// `submitted` must already be normalized (see
    /// [`normalize_submission`](super::otp::normalize_submission)). On
    /// success the order is `delivered`, `otp_verified` is set, and the
    /// pending code is consumed.
    ///
    /// # Errors
    ///
    /// In order: `NotAssigned`, `NoOtp` when no code is pending,
    /// `AlreadyFinal` for a cancelled order, `OtpExpired` at or after the
    /// expiry instant, `OtpMismatch` for a wrong code. Expired codes stay
    /// stored.
    pub fn verify_otp(
        &mut self,
        courier: UserId,
        submitted: &str,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        self.ensure_assigned(courier)?;
        let otp = self.otp.as_ref().ok_or(OrderError::NoOtp)?;
        if self.status == OrderStatus::Cancelled {
            return Err(OrderError::AlreadyFinal(self.status));
        }
        if otp.is_expired(now) {
            return Err(OrderError::OtpExpired);
        }
        if !otp.code.matches(submitted) {
            return Err(OrderError::OtpMismatch);
        }

        self.status = OrderStatus::Delivered;
        self.otp_verified = true;
        self.otp = None;
        Ok(())
    }
}
