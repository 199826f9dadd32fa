//! Client-side filtering of list views
//!
//! A search term matches an item when any of its text fields contains the
//! term, ignoring case. Request lists can also be narrowed to one status.

use ota_core::{
    CarTypeByEcu, CarTypeSummary, CompatibleEcu, CompatibleVersion, DownloadRequest, Ecu,
    EcuSummary, FirmwareVersion, RequestStatus, ServiceRequest,
};

/// An item a list view can be searched on
pub trait Searchable {
    /// Text fields the search term is matched against
    fn search_fields(&self) -> Vec<&str>;

    /// Lifecycle status, for items that have one
    fn status(&self) -> Option<RequestStatus> {
        None
    }
}

/// Search term and status narrowing a list
#[derive(Debug, Clone, Copy, Default)]
pub struct ListFilter<'a> {
    pub search: Option<&'a str>,
    pub status: Option<RequestStatus>,
}

impl<'a> ListFilter<'a> {
    pub fn search(search: Option<&'a str>) -> Self {
        Self {
            search,
            status: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.term().is_some() || self.status.is_some()
    }

    pub fn matches<T: Searchable + ?Sized>(&self, item: &T) -> bool {
        let status_ok = match self.status {
            Some(status) => item.status() == Some(status),
            None => true,
        };
        let search_ok = match self.term() {
            Some(term) => {
                let term = term.to_lowercase();
                item.search_fields()
                    .iter()
                    .any(|field| field.to_lowercase().contains(&term))
            }
            None => true,
        };
        status_ok && search_ok
    }

    pub fn apply<T: Searchable>(&self, items: Vec<T>) -> Vec<T> {
        if !self.is_active() {
            return items;
        }
        items.into_iter().filter(|item| self.matches(item)).collect()
    }

    fn term(&self) -> Option<&'a str> {
        self.search.map(str::trim).filter(|term| !term.is_empty())
    }
}

impl Searchable for CarTypeSummary {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.model_number.as_str()]
    }
}

impl Searchable for CarTypeByEcu {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.model_number.as_str()]
    }
}

impl Searchable for Ecu {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.model_number.as_str()]
    }
}

impl Searchable for EcuSummary {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.model_number.as_str()]
    }
}

impl Searchable for CompatibleEcu {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.model_number.as_str()]
    }
}

impl Searchable for FirmwareVersion {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.version_number.as_str(), self.hex_file_path.as_str()];
        fields.extend(self.compatible_car_types.iter().map(String::as_str));
        fields
    }
}

impl Searchable for CompatibleVersion {
    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.version_number.as_str(),
            self.hex_file_path.as_str(),
            self.ecu_name.as_str(),
            self.ecu_model.as_str(),
        ]
    }
}

impl Searchable for ServiceRequest {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.car_id.as_str(), self.car_type.as_str()];
        fields.extend(self.ip_address.as_deref());
        fields
    }

    fn status(&self) -> Option<RequestStatus> {
        Some(self.status)
    }
}

impl Searchable for DownloadRequest {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.car_id.as_str(), self.car_type.as_str()];
        fields.extend(self.ip_address.as_deref());
        fields
    }

    fn status(&self) -> Option<RequestStatus> {
        Some(self.status)
    }
}
