// src/services/logistics_service.rs
use async_trait::async_trait;
use chrono::Utc;
use nanoid::nanoid;
use std::sync::Arc;
use tracing;

use crate::{
    errors::KekeError as AppError,
    models::{
        order::{DeliveryOrder, OrderAdvance, OrderRequest, OrderStatus},
        pricing::FareSplit,
        wallet::TransactionKind,
    },
    services::{
        messaging_service::NotificationService,
        pricing_service::{quote_delivery, resolve_distance_km},
        store_service::{StoreService, StoreState},
    },
    utils::id_generator::{IdType, WithGeneratedId},
};

const TRACKING_PREFIX: &str = "KN";
const TRACKING_ALPHABET: [char; 36] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V',
    'W', 'X', 'Y', 'Z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

pub fn generate_tracking_code() -> String {
    format!("{}{}", TRACKING_PREFIX, nanoid!(8, &TRACKING_ALPHABET))
}

#[async_trait]
pub trait LogisticsOperations: Send + Sync {
    async fn create_order(&self, request: OrderRequest) -> Result<DeliveryOrder, AppError>;
    async fn get_order(&self, order_id: &str) -> Result<Option<DeliveryOrder>, AppError>;
    async fn track_order(&self, tracking_code: &str) -> Result<Option<DeliveryOrder>, AppError>;
    async fn get_orders_for_customer(&self, customer_id: &str) -> Result<Vec<DeliveryOrder>, AppError>;
    async fn advance_order(&self, order_id: &str, advance: OrderAdvance) -> Result<DeliveryOrder, AppError>;
    async fn cancel_order(&self, order_id: &str) -> Result<DeliveryOrder, AppError>;
}

pub struct LogisticsService {
    store: Arc<StoreService>,
    notification_service: Arc<dyn NotificationService>,
}

impl LogisticsService {
    pub fn new(store: Arc<StoreService>, notification_service: Arc<dyn NotificationService>) -> Self {
        Self {
            store,
            notification_service,
        }
    }

    async fn notify(&self, order: &DeliveryOrder) {
        if let Err(e) = self.notification_service.notify_delivery_update(order).await {
            tracing::warn!("Failed to notify customer of order {}: {}", order.id, e);
        }
    }
}

/// Charges the customer once the package is delivered; the rider keeps the
/// same share of the fee a driver keeps of a ride fare.
fn settle_delivery(state: &mut StoreState, order_id: &str, total: f64, customer_id: &str, driver_id: Option<&str>) {
    let split = FareSplit::compute(total, state.settings.commission_rate);

    state.apply_to_wallet(customer_id, TransactionKind::DeliveryFee, -split.fare, Some(order_id));
    if let Some(driver) = driver_id.and_then(|id| state.drivers.get_mut(id)) {
        driver.today_earnings += split.driver_share;
        driver.total_earnings += split.driver_share;
        let id = driver.id().to_string();
        state.apply_to_wallet(&id, TransactionKind::RideEarning, split.driver_share, Some(order_id));
    }
    state.platform_revenue += split.commission;
    state.record_transaction(None, TransactionKind::Commission, split.commission, Some(order_id));
}

#[async_trait]
impl LogisticsOperations for LogisticsService {
    async fn create_order(&self, request: OrderRequest) -> Result<DeliveryOrder, AppError> {
        tracing::info!("Creating {:?} delivery for customer: {}", request.package_size, request.customer_id);

        if self.store.get_user(&request.customer_id).await.is_none() {
            return Err(AppError::user_not_found(&request.customer_id));
        }

        let distance_km = resolve_distance_km(&request.pickup, &request.dropoff, request.distance_km)?;
        let settings = self.store.settings().await;
        let pricing = quote_delivery(&settings, request.package_size, request.weight_kg, distance_km)?;

        let now = Utc::now();
        let order = DeliveryOrder {
            id: String::new(),
            customer_id: request.customer_id,
            driver_id: None,
            status: OrderStatus::Pending,
            pickup: request.pickup,
            dropoff: request.dropoff,
            distance_km,
            package_size: request.package_size,
            weight_kg: request.weight_kg,
            description: request.description,
            pricing,
            tracking_code: generate_tracking_code(),
            created_at: now,
            picked_up_at: None,
            delivered_at: None,
            cancelled_at: None,
            updated_at: now,
        }
        .with_generated_id(IdType::Order);

        self.store.insert_order(order.clone()).await;
        tracing::info!("Order created: {} ({})", order.id, order.tracking_code);

        self.notify(&order).await;
        Ok(order)
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<DeliveryOrder>, AppError> {
        tracing::debug!("Getting order: {}", order_id);
        Ok(self.store.get_order(order_id).await)
    }

    async fn track_order(&self, tracking_code: &str) -> Result<Option<DeliveryOrder>, AppError> {
        let code = tracking_code.trim().to_uppercase();
        let state = self.store.read().await;
        Ok(state.orders.values().find(|order| order.tracking_code == code).cloned())
    }

    async fn get_orders_for_customer(&self, customer_id: &str) -> Result<Vec<DeliveryOrder>, AppError> {
        let state = self.store.read().await;
        let mut orders: Vec<DeliveryOrder> = state
            .orders
            .values()
            .filter(|order| order.customer_id == customer_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// Moves an order one step along `Pending → Assigned → PickedUp → InTransit → Delivered`.
    async fn advance_order(&self, order_id: &str, advance: OrderAdvance) -> Result<DeliveryOrder, AppError> {
        let order = {
            let mut guard = self.store.write().await;
            let state = &mut *guard;
            let order = state
                .orders
                .get_mut(order_id)
                .ok_or_else(|| AppError::OrderNotFound(order_id.to_string()))?;

            let next = order
                .status
                .next()
                .ok_or_else(|| AppError::invalid_transition("order", order.status, "next step"))?;

            if next == OrderStatus::Assigned {
                let driver_id = advance
                    .driver_id
                    .ok_or_else(|| AppError::MissingRequiredField("driver_id".to_string()))?;
                match state.drivers.get(&driver_id) {
                    Some(driver) if driver.is_available() => {}
                    Some(_) => return Err(AppError::DriverNotAvailable(driver_id)),
                    None => return Err(AppError::driver_not_found(driver_id)),
                }
                order.driver_id = Some(driver_id);
            }

            let now = Utc::now();
            match next {
                OrderStatus::PickedUp => order.picked_up_at = Some(now),
                OrderStatus::Delivered => order.delivered_at = Some(now),
                _ => {}
            }
            order.status = next;
            order.updated_at = now;
            let order = order.clone();

            if order.status == OrderStatus::Delivered {
                settle_delivery(
                    state,
                    &order.id,
                    order.pricing.total,
                    &order.customer_id,
                    order.driver_id.as_deref(),
                );
            }
            order
        };

        tracing::info!("Order {} is now {:?}", order.id, order.status);
        self.notify(&order).await;
        Ok(order)
    }

    async fn cancel_order(&self, order_id: &str) -> Result<DeliveryOrder, AppError> {
        let order = {
            let mut state = self.store.write().await;
            let order = state
                .orders
                .get_mut(order_id)
                .ok_or_else(|| AppError::OrderNotFound(order_id.to_string()))?;

            if !order.status.is_cancellable() {
                return Err(AppError::invalid_transition("order", order.status, OrderStatus::Cancelled));
            }
            let now = Utc::now();
            order.status = OrderStatus::Cancelled;
            order.cancelled_at = Some(now);
            order.updated_at = now;
            order.clone()
        };

        tracing::info!("Order {} cancelled", order.id);
        self.notify(&order).await;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        driver::{Driver, DriverStatus},
        order::PackageSize,
        pricing::VehicleType,
        ride::Place,
        user::{Role, User},
    };
    use crate::services::messaging_service::MockNotificationService;

    const CUSTOMER: &str = "usr-261016-ccccc";
    const RIDER: &str = "drv-261016-rrrrr";

    async fn setup() -> (Arc<StoreService>, LogisticsService) {
        let store = Arc::new(StoreService::default());
        let mut customer = User::new("Bisi".into(), "bisi@keke.ng".into(), "0805".into(), Role::Logistics);
        customer.id = CUSTOMER.into();
        customer.wallet_balance = 5000.0;
        store.insert_user(customer).await;

        let mut user = User::new("Tunde".into(), "tunde@keke.ng".into(), "0806".into(), Role::Driver);
        user.id = RIDER.into();
        store
            .insert_driver(Driver {
                user,
                vehicle_type: VehicleType::Okada,
                plate: "LAG-77".into(),
                rating: 4.5,
                status: DriverStatus::Active,
                total_earnings: 0.0,
                today_earnings: 0.0,
                completed_rides: 0,
            })
            .await;

        let service = LogisticsService::new(store.clone(), Arc::new(MockNotificationService));
        (store, service)
    }

    fn request() -> OrderRequest {
        OrderRequest {
            customer_id: CUSTOMER.into(),
            pickup: Place { address: "Yaba".into(), coordinates: None },
            dropoff: Place { address: "Ikeja".into(), coordinates: None },
            distance_km: Some(2.0),
            package_size: PackageSize::Medium,
            weight_kg: 7.0,
            description: Some("Shoes".into()),
        }
    }

    #[test]
    fn test_tracking_code_shape() {
        let code = generate_tracking_code();
        assert_eq!(code.len(), 10);
        assert!(code.starts_with("KN"));
        assert!(code[2..].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_order_walks_to_delivery() {
        let (store, service) = setup().await;
        let order = service.create_order(request()).await.unwrap();
        assert_eq!(order.pricing.total, 1140.0);
        assert!(service.track_order(&order.tracking_code.to_lowercase()).await.unwrap().is_some());

        // Assignment needs a rider
        let missing = service.advance_order(&order.id, OrderAdvance::default()).await;
        assert!(matches!(missing, Err(AppError::MissingRequiredField(_))));

        let assigned = service
            .advance_order(&order.id, OrderAdvance { driver_id: Some(RIDER.into()) })
            .await
            .unwrap();
        assert_eq!(assigned.status, OrderStatus::Assigned);

        for expected in [OrderStatus::PickedUp, OrderStatus::InTransit, OrderStatus::Delivered] {
            let order = service.advance_order(&order.id, OrderAdvance::default()).await.unwrap();
            assert_eq!(order.status, expected);
        }

        let result = service.advance_order(&order.id, OrderAdvance::default()).await;
        assert!(matches!(result, Err(AppError::InvalidTransition { .. })));

        assert_eq!(store.get_user(CUSTOMER).await.unwrap().wallet_balance, 5000.0 - 1140.0);
        assert_eq!(store.get_driver(RIDER).await.unwrap().today_earnings, 912.0);
    }

    #[tokio::test]
    async fn test_cancel_only_before_pickup() {
        let (_store, service) = setup().await;
        let order = service.create_order(request()).await.unwrap();
        let cancelled = service.cancel_order(&order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        let order = service.create_order(request()).await.unwrap();
        service
            .advance_order(&order.id, OrderAdvance { driver_id: Some(RIDER.into()) })
            .await
            .unwrap();
        service.advance_order(&order.id, OrderAdvance::default()).await.unwrap();
        let result = service.cancel_order(&order.id).await;
        assert!(matches!(result, Err(AppError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_unknown_customer_rejected() {
        let (_store, service) = setup().await;
        let mut req = request();
        req.customer_id = "usr-261016-zzzzz".into();
        assert!(matches!(service.create_order(req).await, Err(AppError::UserNotFound(_))));
    }
}
