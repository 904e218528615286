//! Buyer payment methods.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::addresses::AddressService;
use super::not_blank;
use crate::domain::aggregates::{PaymentMethod, PaymentType};
use crate::store::{DocumentStore, Filter, FindOptions, Page, PageRequest, Repository, Sort};
use crate::{MarketError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentMethodRequest {
    #[validate(custom = "not_blank")]
    pub payment_token: String,
    #[serde(rename = "type", default)]
    pub payment_type: PaymentType,
    pub billing_address_id: Uuid,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPaymentMethodsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Clone)]
pub struct PaymentMethodService {
    methods: Repository<PaymentMethod>,
    addresses: AddressService,
}

impl PaymentMethodService {
    pub fn new(store: Arc<dyn DocumentStore>, addresses: AddressService) -> Self {
        Self { methods: Repository::new(store), addresses }
    }

    /// A new default method clears the flag on the user's other methods.
    pub async fn create(&self, user_id: Uuid, req: CreatePaymentMethodRequest) -> Result<PaymentMethod> {
        req.validate()?;
        self.addresses.get_owned(user_id, req.billing_address_id).await?;
        if req.is_default {
            self.clear_default(user_id).await?;
        }
        let method = PaymentMethod {
            id: Uuid::now_v7(),
            user_id,
            payment_token: req.payment_token,
            payment_type: req.payment_type,
            billing_address_id: req.billing_address_id,
            is_default: req.is_default,
            created_at: Utc::now(),
        };
        self.methods.insert(&method).await?;
        tracing::debug!(user_id = %user_id, payment_method_id = %method.id, "payment method created");
        Ok(method)
    }

    pub async fn list_mine(&self, user_id: Uuid, query: ListPaymentMethodsQuery) -> Result<Page<PaymentMethod>> {
        let request = PageRequest::new(query.page, query.limit);
        Ok(self.methods.page(Filter::new().eq("userId", user_id), Sort::newest_first(), request).await?)
    }

    pub async fn get_owned(&self, user_id: Uuid, id: Uuid) -> Result<PaymentMethod> {
        match self.methods.get(id).await? {
            Some(method) if method.user_id == user_id => Ok(method),
            _ => Err(MarketError::NotFound("Payment method")),
        }
    }

    pub async fn delete_mine(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        self.get_owned(user_id, id).await?;
        self.delete(id).await
    }

    pub(crate) async fn delete(&self, id: Uuid) -> Result<()> {
        if !self.methods.delete(id).await? {
            return Err(MarketError::NotFound("Payment method"));
        }
        Ok(())
    }

    /// Make `id` the user's only default method.
    pub(crate) async fn promote_default(&self, user_id: Uuid, id: Uuid) -> Result<PaymentMethod> {
        let mut method = self.get_owned(user_id, id).await?;
        self.clear_default(user_id).await?;
        method.is_default = true;
        self.methods.replace(&method).await?;
        Ok(method)
    }

    async fn clear_default(&self, user_id: Uuid) -> Result<()> {
        let defaults = self
            .methods
            .find(&FindOptions::filtered(Filter::new().eq("userId", user_id).eq("isDefault", true)))
            .await?;
        for mut method in defaults {
            method.is_default = false;
            self.methods.replace(&method).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::AddressType;
    use crate::services::addresses::CreateAddressRequest;
    use crate::store::InMemoryStore;

    async fn setup() -> (PaymentMethodService, Uuid, Uuid) {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryStore::new());
        let addresses = AddressService::new(Arc::clone(&store));
        let user = Uuid::new_v4();
        let billing = addresses
            .create(user, CreateAddressRequest {
                address_line1: "Piassa 4".into(), address_line2: None, city: "Addis Ababa".into(),
                state_province_region: "Addis Ababa".into(), postal_code: "1000".into(), country: "ET".into(),
                contact_name: "Yared".into(), contact_phone: "+251900000000".into(), address_type: AddressType::Billing,
            })
            .await
            .unwrap();
        (PaymentMethodService::new(store, addresses), user, billing.id)
    }

    fn request(billing_address_id: Uuid, is_default: bool) -> CreatePaymentMethodRequest {
        CreatePaymentMethodRequest { payment_token: "tok_demo_1".into(), payment_type: PaymentType::Cod, billing_address_id, is_default }
    }

    #[tokio::test]
    async fn test_new_default_clears_previous_default() {
        let (service, user, billing) = setup().await;
        let first = service.create(user, request(billing, true)).await.unwrap();
        let second = service.create(user, request(billing, true)).await.unwrap();
        assert!(!service.get_owned(user, first.id).await.unwrap().is_default);
        assert!(service.get_owned(user, second.id).await.unwrap().is_default);
    }

    #[tokio::test]
    async fn test_promote_default_leaves_single_default() {
        let (service, user, billing) = setup().await;
        let first = service.create(user, request(billing, true)).await.unwrap();
        let second = service.create(user, request(billing, false)).await.unwrap();
        service.promote_default(user, second.id).await.unwrap();
        assert!(!service.get_owned(user, first.id).await.unwrap().is_default);
        assert!(service.get_owned(user, second.id).await.unwrap().is_default);

        let err = service.promote_default(Uuid::new_v4(), first.id).await.unwrap_err();
        assert!(matches!(err, MarketError::NotFound("Payment method")));
    }

    #[tokio::test]
    async fn test_billing_address_must_belong_to_user() {
        let (service, _, billing) = setup().await;
        let err = service.create(Uuid::new_v4(), request(billing, false)).await.unwrap_err();
        assert!(matches!(err, MarketError::NotFound("Address")));
    }

    #[test]
    fn test_request_wire_shape() {
        let req: CreatePaymentMethodRequest = serde_json::from_value(serde_json::json!({
            "paymentToken": "tok_demo_1700000000000",
            "type": "mobile_money",
            "billingAddressId": Uuid::nil(),
            "isDefault": true
        }))
        .unwrap();
        assert_eq!(req.payment_type, PaymentType::MobileMoney);
        assert!(req.is_default);
    }
}
