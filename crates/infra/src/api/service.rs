//! OFleet endpoint surface
//!
//! One method per remote endpoint. Every method is a thin wrapper over the
//! [`ApiClient`] primitives; entities travel as opaque JSON.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use ofleet_domain::constants::{
    CLIENT_BOOKINGS_PAGE_SIZE, DRIVING_LICENSE_FIELD, ID_CARD_FIELD, REWARD_POINTS_ATTRIBUTE,
    USED_REWARD_POINTS_ATTRIBUTE,
};
use ofleet_domain::utils::{apply_reward_points, coerce_f64, count_by_property, reward_point_balance};
use ofleet_domain::{
    Booking, BookingVehicleChange, Client, DocumentUpload, OfleetConfig, PropertyCount, Vehicle,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};
use urlencoding::encode;

use super::client::ApiClient;
use super::errors::ApiError;

/// Domain wrapper over the OFleet REST API
#[derive(Clone)]
pub struct OfleetService {
    client: Arc<ApiClient>,
}

impl OfleetService {
    /// Create a new service instance
    ///
    /// # Arguments
    ///
    /// * `client` - API client
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Build the API client from a configuration and wrap it
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` if the configuration is invalid
    pub fn from_config(config: OfleetConfig) -> Result<Self, ApiError> {
        Ok(Self::new(Arc::new(ApiClient::new(config)?)))
    }

    /// The underlying API client
    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    // === Reference data ===

    /// All rental agencies
    #[instrument(skip(self))]
    pub async fn list_agencies(&self) -> Result<Value, ApiError> {
        self.client.get("/agencies/list").await
    }

    /// Pickup/dropoff locations matching `filter`
    #[instrument(skip(self))]
    pub async fn list_locations(&self, filter: &str) -> Result<Value, ApiError> {
        self.client.get(&format!("/locations/list{}", query(&[("filter", filter)]))).await
    }

    /// Countries matching `filter`
    #[instrument(skip(self))]
    pub async fn list_countries(&self, filter: &str) -> Result<Value, ApiError> {
        self.client.get(&format!("/countries/list{}", query(&[("filter", filter)]))).await
    }

    /// Accepted identity document types
    #[instrument(skip(self))]
    pub async fn id_card_types(&self) -> Result<Value, ApiError> {
        self.client.get("/clients/id-card-types").await
    }

    /// Tax rate setting as a number; non-numeric values read as `0.0`
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails
    #[instrument(skip(self))]
    pub async fn get_tax_percent(&self) -> Result<f64, ApiError> {
        let value: Value = self.client.get("/settings/setting/taxPercent").await?;
        Ok(coerce_f64(&value))
    }

    // === Vehicles ===

    /// Vehicle catalogue; `keep_same_model` keeps same-model duplicates
    #[instrument(skip(self))]
    pub async fn list_vehicles(&self, keep_same_model: bool) -> Result<Value, ApiError> {
        let path = format!("/vehicles/list{}", query(&[("keepSameModel", bool_str(keep_same_model))]));
        self.client.get(&path).await
    }

    /// Vehicles flagged for promotion
    #[instrument(skip(self))]
    pub async fn featured_vehicles(&self) -> Result<Value, ApiError> {
        self.client.get("/vehicles/featured").await
    }

    /// One vehicle by id
    #[instrument(skip(self))]
    pub async fn get_vehicle(&self, id: &str) -> Result<Vehicle, ApiError> {
        self.client.get(&format!("/vehicles/vehicle/{}", encode(id))).await
    }

    /// Vehicle with its price for the given period
    #[instrument(skip(self))]
    pub async fn get_vehicle_with_pricing(
        &self,
        id: &str,
        from_date: &str,
        to_date: &str,
    ) -> Result<Vehicle, ApiError> {
        let path = format!(
            "/vehicles/vehicle/{}{}",
            encode(id),
            query(&[("fromDate", from_date), ("toDate", to_date)])
        );
        self.client.get(&path).await
    }

    /// Vehicles free over a period
    ///
    /// Outsourced vehicles are never reported as available and same-model
    /// duplicates are collapsed. Pass the contract being edited as
    /// `rental_contract_id` so its own vehicle counts as free.
    #[instrument(skip(self))]
    pub async fn available_vehicles(
        &self,
        from_date: &str,
        to_date: &str,
        rental_contract_id: Option<&str>,
    ) -> Result<Value, ApiError> {
        let mut params = vec![
            ("showOutsourcedAsAvailable", "false"),
            ("fromDate", from_date),
            ("toDate", to_date),
            ("keepSameModelDuplicates", "false"),
        ];
        if let Some(contract_id) = rental_contract_id {
            params.push(("rentalContractId", contract_id));
        }

        self.client.get(&format!("/vehicles/vehiclesByState/available{}", query(&params))).await
    }

    /// Whether one vehicle is free over a period
    #[instrument(skip(self))]
    pub async fn is_vehicle_available(
        &self,
        vehicle_id: &str,
        from_date: &str,
        to_date: &str,
        rental_contract_id: Option<&str>,
    ) -> Result<Value, ApiError> {
        let mut params =
            vec![("showOutsourcedAsAvailable", "false"), ("fromDate", from_date), ("toDate", to_date)];
        if let Some(contract_id) = rental_contract_id {
            params.push(("rentalContractId", contract_id));
        }

        let path = format!("/vehicles/vehicle/{}/available{}", encode(vehicle_id), query(&params));
        self.client.get(&path).await
    }

    /// Daily rate of a vehicle over a period
    #[instrument(skip(self))]
    pub async fn get_vehicle_day_rate(
        &self,
        vehicle_id: &str,
        from_date: &str,
        to_date: &str,
    ) -> Result<Value, ApiError> {
        let path = format!(
            "/vehicles/vehicle/{}/rate{}",
            encode(vehicle_id),
            query(&[("fromDate", from_date), ("toDate", to_date)])
        );
        self.client.get(&path).await
    }

    /// Equipment options priced for a vehicle
    #[instrument(skip(self))]
    pub async fn list_options_for_vehicle(&self, vehicle_id: &str) -> Result<Value, ApiError> {
        self.client.get(&format!("/vehicles/vehicle/{}/rates/equipments", encode(vehicle_id))).await
    }

    /// Insurance options priced for a vehicle
    #[instrument(skip(self))]
    pub async fn list_insurances_for_vehicle(&self, vehicle_id: &str) -> Result<Value, ApiError> {
        self.client.get(&format!("/vehicles/vehicle/{}/rates/insurances", encode(vehicle_id))).await
    }

    /// Group vehicles by `vehicle[prop][key]`, most populated group first
    pub fn count_by_property(vehicles: &[Vehicle], prop: &str, key: &str) -> Vec<PropertyCount> {
        count_by_property(vehicles, prop, key)
    }

    // === Bookings ===

    /// Billable days of a contract over a period
    #[instrument(skip(self))]
    pub async fn calculate_number_of_days_for_contract(
        &self,
        contract_id: &str,
        from_date: &str,
        to_date: &str,
    ) -> Result<Value, ApiError> {
        let path = format!(
            "/contracts/count-days/contract/{}{}",
            encode(contract_id),
            query(&[("fromDate", from_date), ("toDate", to_date)])
        );
        self.client.get(&path).await
    }

    /// Let the server price a contract draft
    #[instrument(skip(self, contract))]
    pub async fn compute_contract_amount<T: Serialize + ?Sized>(
        &self,
        contract: &T,
    ) -> Result<Booking, ApiError> {
        self.client.post("/contracts/compute", contract).await
    }

    /// First page of a client's bookings
    #[instrument(skip(self))]
    pub async fn list_bookings_for_client(&self, client_id: &str) -> Result<Value, ApiError> {
        let size = CLIENT_BOOKINGS_PAGE_SIZE.to_string();
        let path = format!("/contracts/client/{}{}", encode(client_id), query(&[("size", size.as_str())]));
        self.client.get(&path).await
    }

    /// Values of one booking attribute across a client's bookings
    #[instrument(skip(self))]
    pub async fn get_bookings_attribute_values(
        &self,
        client_id: &str,
        attribute_name: &str,
    ) -> Result<Value, ApiError> {
        let path = format!(
            "/contracts/attribute-values{}",
            query(&[("clientId", client_id), ("attributeName", attribute_name)])
        );
        self.client.get(&path).await
    }

    /// Reward points earned minus reward points used across all bookings
    ///
    /// # Errors
    ///
    /// Returns error if either attribute series cannot be fetched
    #[instrument(skip(self))]
    pub async fn count_reward_points(&self, client_id: &str) -> Result<i64, ApiError> {
        let earned = self.get_bookings_attribute_values(client_id, REWARD_POINTS_ATTRIBUTE).await?;
        let used =
            self.get_bookings_attribute_values(client_id, USED_REWARD_POINTS_ATTRIBUTE).await?;

        let balance = reward_point_balance(&earned, &used);
        debug!(balance, "Reward points counted");
        Ok(balance)
    }

    /// One booking by id
    #[instrument(skip(self))]
    pub async fn get_booking(&self, booking_id: &str) -> Result<Booking, ApiError> {
        self.client.get(&format!("/contracts/contract/{}", encode(booking_id))).await
    }

    /// One booking by its contract number
    #[instrument(skip(self))]
    pub async fn get_booking_by_contract_number(
        &self,
        contract_number: &str,
    ) -> Result<Booking, ApiError> {
        self.client.get(&format!("/contracts/contract/number/{}", encode(contract_number))).await
    }

    /// Rental contract document (PDF bytes)
    #[instrument(skip(self))]
    pub async fn print_contract(&self, booking_id: &str) -> Result<Bytes, ApiError> {
        self.client.get_raw(&format!("/print/contract/{}", encode(booking_id))).await
    }

    /// Invoice document (PDF bytes)
    #[instrument(skip(self))]
    pub async fn print_invoice(&self, booking_id: &str) -> Result<Bytes, ApiError> {
        self.client.get_raw(&format!("/print/invoices/{}", encode(booking_id))).await
    }

    /// Price a booking, attach its reward points and create it
    ///
    /// The server-priced contract returned by
    /// [`Self::compute_contract_amount`] is what gets submitted.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` if the priced contract carries no
    /// numeric amount; otherwise any API error
    #[instrument(skip(self, booking))]
    pub async fn save_booking<T: Serialize + ?Sized>(
        &self,
        booking: &T,
    ) -> Result<Booking, ApiError> {
        let contract = self.priced_with_reward_points(booking).await?;
        self.client.post("/contracts/contract/create", &contract).await
    }

    /// Price a booking, refresh its reward points and update it
    ///
    /// # Errors
    ///
    /// Same as [`Self::save_booking`]
    #[instrument(skip(self, booking))]
    pub async fn update_booking<T: Serialize + ?Sized>(
        &self,
        booking: &T,
    ) -> Result<Booking, ApiError> {
        let contract = self.priced_with_reward_points(booking).await?;
        self.client.post("/contracts/contract/update", &contract).await
    }

    /// Turn a reservation into a confirmed booking
    #[instrument(skip(self))]
    pub async fn validate_reservation(&self, booking_id: &str) -> Result<Value, ApiError> {
        self.client
            .get(&format!("/contracts/contract/{}/validateReservation", encode(booking_id)))
            .await
    }

    /// Move a booking to another vehicle or period, optionally persisting
    #[instrument(skip(self), fields(booking_id = %change.booking_id))]
    pub async fn change_booking_vehicle(
        &self,
        change: &BookingVehicleChange,
    ) -> Result<Value, ApiError> {
        let delivery_fee = change.delivery_fee.to_string();
        let dropoff_fee = change.dropoff_fee.to_string();
        let params = [
            ("vehicleId", change.vehicle_id.as_str()),
            ("fromDate", change.from_date.as_str()),
            ("toDate", change.to_date.as_str()),
            ("deliveryFee", delivery_fee.as_str()),
            ("dropoffFee", dropoff_fee.as_str()),
            ("save", bool_str(change.save)),
        ];

        let path =
            format!("/contracts/contract/{}/modify{}", encode(&change.booking_id), query(&params));
        self.client.get(&path).await
    }

    async fn priced_with_reward_points<T: Serialize + ?Sized>(
        &self,
        booking: &T,
    ) -> Result<Value, ApiError> {
        let mut contract = self.compute_contract_amount(booking).await?;
        let points = apply_reward_points(&mut contract)?;
        debug!(reward_points = points, "Reward points attached to priced contract");
        Ok(contract)
    }

    // === Clients and users ===

    /// Look up a user account by username
    #[instrument(skip(self))]
    pub async fn check_user(&self, username: &str) -> Result<Value, ApiError> {
        self.client.get(&format!("/auth/user{}", query(&[("username", username)]))).await
    }

    /// Look up a user account by id
    #[instrument(skip(self))]
    pub async fn check_user_by_id(&self, user_id: &str) -> Result<Value, ApiError> {
        self.client.get(&format!("/auth/user{}", query(&[("id", user_id)]))).await
    }

    /// Create a client record
    #[instrument(skip(self, client))]
    pub async fn create_client<T: Serialize + ?Sized>(&self, client: &T) -> Result<Client, ApiError> {
        self.client.post("/clients/client/create", client).await
    }

    /// Update a client record
    #[instrument(skip(self, client))]
    pub async fn update_client<T: Serialize + ?Sized>(&self, client: &T) -> Result<Client, ApiError> {
        self.client.post("/clients/client/update", client).await
    }

    /// Attach a driving licence scan to a client
    #[instrument(skip(self, document), fields(file_name = %document.file_name))]
    pub async fn update_client_driving_license(
        &self,
        client_id: &str,
        document: &DocumentUpload,
    ) -> Result<Client, ApiError> {
        let path = format!("/clients/client/{}/update/driving-license", encode(client_id));
        self.client
            .upload(&path, DRIVING_LICENSE_FIELD, &document.content, &document.file_name)
            .await
    }

    /// Attach an identity card scan to a client
    #[instrument(skip(self, document), fields(file_name = %document.file_name))]
    pub async fn update_client_id_card(
        &self,
        client_id: &str,
        document: &DocumentUpload,
    ) -> Result<Client, ApiError> {
        let path = format!("/clients/client/{}/update/id-card", encode(client_id));
        self.client.upload(&path, ID_CARD_FIELD, &document.content, &document.file_name).await
    }

    /// Change a client's password
    #[instrument(skip(self, password_update))]
    pub async fn change_password<T: Serialize + ?Sized>(
        &self,
        client_id: &str,
        password_update: &T,
    ) -> Result<Value, ApiError> {
        self.client
            .post(&format!("/auth/change-password/{}", encode(client_id)), password_update)
            .await
    }
}

/// Read a file into a [`DocumentUpload`] named after the path's last
/// component
///
/// # Errors
///
/// Returns `ApiError::InvalidInput` if the file cannot be read or the path
/// has no file name
pub async fn load_document(path: impl AsRef<Path>) -> Result<DocumentUpload, ApiError> {
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            ApiError::InvalidInput(format!("{} has no usable file name", path.display()))
        })?
        .to_string();

    let content = tokio::fs::read(path)
        .await
        .map_err(|e| ApiError::InvalidInput(format!("Failed to read {}: {e}", path.display())))?;

    Ok(DocumentUpload::new(file_name, content))
}

fn query(params: &[(&str, &str)]) -> String {
    let pairs: Vec<String> =
        params.iter().map(|(key, value)| format!("{key}={}", encode(value))).collect();
    format!("?{}", pairs.join("&"))
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
