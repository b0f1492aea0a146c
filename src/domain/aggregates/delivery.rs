//! Delivery selection: client, then sub-service, then sub-location.
//!
//! Choosing a level clears every level below it. A selection is complete once
//! each level that offers options has one chosen.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, alias = "nombre")]
    pub name: String,
    #[serde(default, alias = "subServicios")]
    pub sub_services: Vec<SubService>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubService {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, alias = "nombre")]
    pub name: String,
    #[serde(default, alias = "subUbicaciones")]
    pub sub_locations: Vec<SubLocation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubLocation {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, alias = "nombre")]
    pub name: String,
}

/// Where an order goes, as plain ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryTarget {
    #[validate(length(min = 1))]
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_service_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_location_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("unknown client: {0}")]
    UnknownClient(String),
    #[error("unknown sub-service for the selected client: {0}")]
    UnknownSubService(String),
    #[error("unknown sub-location for the selected sub-service: {0}")]
    UnknownSubLocation(String),
    #[error("no client selected")]
    NoClientSelected,
    #[error("no sub-service selected")]
    NoSubServiceSelected,
    #[error("delivery selection incomplete: {0} required")]
    Incomplete(&'static str),
}

#[derive(Clone, Debug, Default)]
pub struct DeliverySelection {
    clients: Vec<Client>,
    client: Option<usize>,
    sub_service: Option<usize>,
    sub_location: Option<usize>,
}

impl DeliverySelection {
    pub fn new(clients: Vec<Client>) -> Self {
        Self { clients, ..Self::default() }
    }

    pub fn clients(&self) -> &[Client] { &self.clients }

    pub fn selected_client(&self) -> Option<&Client> {
        self.client.map(|i| &self.clients[i])
    }

    pub fn selected_sub_service(&self) -> Option<&SubService> {
        let client = self.selected_client()?;
        self.sub_service.map(|i| &client.sub_services[i])
    }

    pub fn selected_sub_location(&self) -> Option<&SubLocation> {
        let sub_service = self.selected_sub_service()?;
        self.sub_location.map(|i| &sub_service.sub_locations[i])
    }

    /// Sub-services offered by the selected client.
    pub fn sub_services(&self) -> &[SubService] {
        self.selected_client().map(|c| c.sub_services.as_slice()).unwrap_or_default()
    }

    /// Sub-locations offered by the selected sub-service.
    pub fn sub_locations(&self) -> &[SubLocation] {
        self.selected_sub_service().map(|s| s.sub_locations.as_slice()).unwrap_or_default()
    }

    pub fn select_client(&mut self, client_id: &str) -> Result<(), DeliveryError> {
        let idx = self
            .clients
            .iter()
            .position(|c| c.id == client_id)
            .ok_or_else(|| DeliveryError::UnknownClient(client_id.to_string()))?;
        if self.client != Some(idx) {
            self.client = Some(idx);
            self.sub_service = None;
            self.sub_location = None;
        }
        Ok(())
    }

    pub fn select_sub_service(&mut self, sub_service_id: &str) -> Result<(), DeliveryError> {
        let client = self.selected_client().ok_or(DeliveryError::NoClientSelected)?;
        let idx = client
            .sub_services
            .iter()
            .position(|s| s.id == sub_service_id)
            .ok_or_else(|| DeliveryError::UnknownSubService(sub_service_id.to_string()))?;
        if self.sub_service != Some(idx) {
            self.sub_service = Some(idx);
            self.sub_location = None;
        }
        Ok(())
    }

    pub fn select_sub_location(&mut self, sub_location_id: &str) -> Result<(), DeliveryError> {
        let sub_service = self.selected_sub_service().ok_or(DeliveryError::NoSubServiceSelected)?;
        let idx = sub_service
            .sub_locations
            .iter()
            .position(|l| l.id == sub_location_id)
            .ok_or_else(|| DeliveryError::UnknownSubLocation(sub_location_id.to_string()))?;
        self.sub_location = Some(idx);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.client = None;
        self.sub_service = None;
        self.sub_location = None;
    }

    /// Swaps in a fresh client list, keeping whatever part of the current
    /// selection still exists in it.
    pub fn replace_clients(&mut self, clients: Vec<Client>) {
        let previous = self.ids();
        *self = Self::new(clients);
        let (client, sub_service, sub_location) = previous;
        let restored = client.map_or(Ok(()), |id| self.select_client(&id))
            .and_then(|_| sub_service.map_or(Ok(()), |id| self.select_sub_service(&id)))
            .and_then(|_| sub_location.map_or(Ok(()), |id| self.select_sub_location(&id)));
        if let Err(e) = restored {
            tracing::debug!(error = %e, "delivery selection partially reset after client refresh");
        }
    }

    pub fn target(&self) -> Result<DeliveryTarget, DeliveryError> {
        let client = self.selected_client().ok_or(DeliveryError::Incomplete("client"))?;
        let sub_service = self.selected_sub_service();
        if sub_service.is_none() && !client.sub_services.is_empty() {
            return Err(DeliveryError::Incomplete("sub-service"));
        }
        let sub_location = self.selected_sub_location();
        if sub_location.is_none() && sub_service.is_some_and(|s| !s.sub_locations.is_empty()) {
            return Err(DeliveryError::Incomplete("sub-location"));
        }
        Ok(DeliveryTarget {
            client_id: client.id.clone(),
            sub_service_id: sub_service.map(|s| s.id.clone()),
            sub_location_id: sub_location.map(|l| l.id.clone()),
        })
    }

    fn ids(&self) -> (Option<String>, Option<String>, Option<String>) {
        (
            self.selected_client().map(|c| c.id.clone()),
            self.selected_sub_service().map(|s| s.id.clone()),
            self.selected_sub_location().map(|l| l.id.clone()),
        )
    }
}
