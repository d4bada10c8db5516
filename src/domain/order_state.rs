//! Order lifecycle transition guards.
//!
//! Each guard takes the fields that decide the transition so the rules stay
//! testable without a database row.

use thiserror::Error;

use crate::model::OrderStatus;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Cannot request cancellation in current state")]
    CancellationNotAllowed,
    #[error("Order has not been shipped yet")]
    NotShipped,
    #[error("Order has already been marked as received")]
    AlreadyReceived,
    #[error("Cannot receive a cancelled order")]
    ReceiveCancelled,
    #[error("Order cannot be shipped in current state")]
    ShipNotAllowed,
    #[error("Order has already shipped")]
    AlreadyShipped,
    #[error("Order is not awaiting cancellation")]
    NotCancellationPending,
}

/// Buyer-side cancellation request: only before shipment, and not for orders
/// already cancelled or awaiting adjudication.
pub fn can_request_cancellation(
    status: OrderStatus,
    shipped: bool,
    delivered: bool,
) -> Result<(), TransitionError> {
    if shipped || delivered {
        return Err(TransitionError::CancellationNotAllowed);
    }
    match status {
        OrderStatus::Cancelled | OrderStatus::CancellationPending => {
            Err(TransitionError::CancellationNotAllowed)
        }
        _ => Ok(()),
    }
}

/// Buyer confirms receipt of a shipped, not-yet-delivered order.
pub fn can_receive(status: OrderStatus, shipped: bool, delivered: bool) -> Result<(), TransitionError> {
    if !shipped {
        return Err(TransitionError::NotShipped);
    }
    if delivered {
        return Err(TransitionError::AlreadyReceived);
    }
    if status == OrderStatus::Cancelled {
        return Err(TransitionError::ReceiveCancelled);
    }
    Ok(())
}

/// Seller dispatches the parcel.
pub fn can_ship(status: OrderStatus, shipped: bool) -> Result<(), TransitionError> {
    if shipped {
        return Err(TransitionError::AlreadyShipped);
    }
    match status {
        OrderStatus::Pending
        | OrderStatus::Processing
        | OrderStatus::Paid
        | OrderStatus::ToShip => Ok(()),
        _ => Err(TransitionError::ShipNotAllowed),
    }
}

/// Seller marks the order as being prepared for dispatch.
pub fn can_mark_to_ship(status: OrderStatus) -> Result<(), TransitionError> {
    match status {
        OrderStatus::Pending | OrderStatus::Processing | OrderStatus::Paid => Ok(()),
        _ => Err(TransitionError::ShipNotAllowed),
    }
}

/// Seller cancels an unshipped order outright.
pub fn can_seller_cancel(status: OrderStatus, shipped: bool) -> Result<(), TransitionError> {
    if shipped {
        return Err(TransitionError::AlreadyShipped);
    }
    if status == OrderStatus::Cancelled {
        return Err(TransitionError::CancellationNotAllowed);
    }
    Ok(())
}

/// Approve/reject endpoints only act on orders awaiting adjudication.
pub fn can_adjudicate_cancellation(status: OrderStatus) -> Result<(), TransitionError> {
    if status == OrderStatus::CancellationPending {
        Ok(())
    } else {
        Err(TransitionError::NotCancellationPending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_blocked_after_shipment() {
        assert_eq!(
            can_request_cancellation(OrderStatus::Paid, true, false),
            Err(TransitionError::CancellationNotAllowed)
        );
        assert_eq!(
            can_request_cancellation(OrderStatus::Completed, true, true),
            Err(TransitionError::CancellationNotAllowed)
        );
    }

    #[test]
    fn test_cancellation_allowed_before_shipment() {
        assert!(can_request_cancellation(OrderStatus::Pending, false, false).is_ok());
        assert!(can_request_cancellation(OrderStatus::Paid, false, false).is_ok());
    }

    #[test]
    fn test_cancellation_not_requestable_twice() {
        assert_eq!(
            can_request_cancellation(OrderStatus::CancellationPending, false, false),
            Err(TransitionError::CancellationNotAllowed)
        );
    }

    #[test]
    fn test_receive_requires_shipment() {
        assert_eq!(
            can_receive(OrderStatus::Processing, false, false),
            Err(TransitionError::NotShipped)
        );
        assert!(can_receive(OrderStatus::Shipped, true, false).is_ok());
        assert_eq!(
            can_receive(OrderStatus::Shipped, true, true),
            Err(TransitionError::AlreadyReceived)
        );
    }

    #[test]
    fn test_ship_once() {
        assert!(can_ship(OrderStatus::Processing, false).is_ok());
        assert_eq!(can_ship(OrderStatus::Processing, true), Err(TransitionError::AlreadyShipped));
        assert_eq!(
            can_ship(OrderStatus::CancellationPending, false),
            Err(TransitionError::ShipNotAllowed)
        );
    }

    #[test]
    fn test_adjudication_needs_pending_request() {
        assert!(can_adjudicate_cancellation(OrderStatus::CancellationPending).is_ok());
        assert_eq!(
            can_adjudicate_cancellation(OrderStatus::Paid),
            Err(TransitionError::NotCancellationPending)
        );
    }
}
