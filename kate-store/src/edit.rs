//! Create/edit buffer for a single route.
//!
//! ```text
//! Closed ──begin_create──▶ Creating ──save/cancel──▶ Closed
//! Closed ──begin_edit───▶ Editing  ──save/cancel──▶ Closed
//! ```

use crate::policy::service_for_route;
use crate::routes::{RouteEdit, RouteRepository, WriteOutcome};
use kate_core::error::KateError;
use kate_core::route::{HttpMethod, KateRoutes, RequestBodyType, transform_path};
use kate_core::service::Service;

#[derive(Debug, Clone, PartialEq)]
pub struct EditBuffer {
    pub path: String,
    pub method: String,
    pub service: Option<Service>,
    pub is_protected: bool,
    pub request_body_type: RequestBodyType,
    /// Row being edited; `None` while creating
    pub original: Option<KateRoutes>,
}

impl EditBuffer {
    fn empty() -> Self {
        Self {
            path: String::new(),
            method: HttpMethod::Get.to_string(),
            service: None,
            is_protected: false,
            request_body_type: RequestBodyType::Json,
            original: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum EditState {
    #[default]
    Closed,
    Creating(EditBuffer),
    Editing(EditBuffer),
}

#[derive(Debug, Default)]
pub struct RouteEditSession {
    state: EditState,
}

impl RouteEditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, EditState::Closed)
    }

    pub fn buffer(&self) -> Option<&EditBuffer> {
        match &self.state {
            EditState::Closed => None,
            EditState::Creating(buf) | EditState::Editing(buf) => Some(buf),
        }
    }

    pub fn begin_create(&mut self) -> Result<(), KateError> {
        self.ensure_closed()?;
        self.state = EditState::Creating(EditBuffer::empty());
        Ok(())
    }

    /// Open an existing row for editing. The row must carry its route.
    pub fn begin_edit(&mut self, row: &KateRoutes, services: &[Service]) -> Result<(), KateError> {
        self.ensure_closed()?;
        let route = row
            .route
            .as_ref()
            .ok_or_else(|| invalid(format!("route {} is not resolved", row.path)))?;
        self.state = EditState::Editing(EditBuffer {
            path: row.path.clone(),
            method: row.method.clone(),
            service: service_for_route(services, row).cloned(),
            is_protected: route.is_protected(),
            request_body_type: route.request_body_type(),
            original: Some(row.clone()),
        });
        Ok(())
    }

    pub fn set_path(&mut self, path: impl Into<String>) -> Result<(), KateError> {
        match &mut self.state {
            EditState::Creating(buf) => {
                buf.path = path.into();
                Ok(())
            }
            EditState::Editing(_) => Err(invalid("path cannot change while editing")),
            EditState::Closed => Err(not_open()),
        }
    }

    pub fn set_method(&mut self, method: HttpMethod) -> Result<(), KateError> {
        self.buffer_mut()?.method = method.to_string();
        Ok(())
    }

    pub fn select_service(&mut self, service: Service) -> Result<(), KateError> {
        self.buffer_mut()?.service = Some(service);
        Ok(())
    }

    pub fn set_protected(&mut self, protected: bool) -> Result<(), KateError> {
        self.buffer_mut()?.is_protected = protected;
        Ok(())
    }

    pub fn set_request_body_type(&mut self, body_type: RequestBodyType) -> Result<(), KateError> {
        self.buffer_mut()?.request_body_type = body_type;
        Ok(())
    }

    /// Check the buffer and build the edit to commit.
    pub fn validate(&self) -> Result<RouteEdit, KateError> {
        let buf = self.buffer().ok_or_else(not_open)?;
        let service = buf
            .service
            .clone()
            .ok_or_else(|| invalid("no service selected"))?;
        buf.method.parse::<HttpMethod>().map_err(invalid)?;
        if buf.path.trim().is_empty() {
            return Err(invalid("path is empty"));
        }

        let route = buf.original.as_ref().and_then(|row| row.route.clone());
        Ok(RouteEdit {
            service,
            routes: KateRoutes::new(buf.path.clone(), buf.method.clone(), route),
            is_protected: buf.is_protected,
            request_body_type: buf.request_body_type,
        })
    }

    /// Commit the buffer through `repo`.
    ///
    /// An invalid buffer returns the validation error and stays open. A write
    /// the repository refused before sending anything also leaves the buffer
    /// open; otherwise the session closes and the outcome is returned.
    pub async fn save(&mut self, repo: &RouteRepository) -> Result<WriteOutcome, KateError> {
        let edit = self.validate()?;
        let outcome = match self.state {
            EditState::Creating(_) => repo.add_route(edit).await,
            EditState::Editing(_) => repo.update_route(edit).await,
            EditState::Closed => return Err(not_open()),
        };
        if outcome != WriteOutcome::Rejected {
            self.state = EditState::Closed;
        }
        Ok(outcome)
    }

    pub fn cancel(&mut self) {
        self.state = EditState::Closed;
    }

    /// Readable name of the buffer's path.
    pub fn display_name(&self) -> Option<String> {
        self.buffer().map(|buf| transform_path(&buf.path))
    }

    fn ensure_closed(&self) -> Result<(), KateError> {
        if self.is_open() {
            return Err(invalid("another route edit is open"));
        }
        Ok(())
    }

    fn buffer_mut(&mut self) -> Result<&mut EditBuffer, KateError> {
        match &mut self.state {
            EditState::Closed => Err(not_open()),
            EditState::Creating(buf) | EditState::Editing(buf) => Ok(buf),
        }
    }
}

fn not_open() -> KateError {
    invalid("no route edit is open")
}

fn invalid(reason: impl std::fmt::Display) -> KateError {
    KateError::Validation(format!("Invalid route: {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kate_core::route::{Method, Route};

    fn row_with_route() -> (KateRoutes, Vec<Service>) {
        let route = Route::new("/users/{user_id}", vec![Method::new("PUT", RequestBodyType::FormData)]);
        let services = vec![Service::new("users", vec![route.clone()])];
        (KateRoutes::new("/users/{user_id}", "PUT", Some(route)), services)
    }

    #[test]
    fn begin_create_opens_empty_buffer() {
        let mut session = RouteEditSession::new();
        session.begin_create().unwrap();
        let buf = session.buffer().unwrap();
        assert_eq!(buf.path, "");
        assert_eq!(buf.method, "GET");
        assert!(buf.service.is_none());
        assert!(!buf.is_protected);
        assert_eq!(buf.request_body_type, RequestBodyType::Json);
    }

    #[test]
    fn begin_edit_seeds_from_row() {
        let (row, services) = row_with_route();
        let mut session = RouteEditSession::new();
        session.begin_edit(&row, &services).unwrap();

        assert!(matches!(session.state(), EditState::Editing(_)));
        let buf = session.buffer().unwrap();
        assert_eq!(buf.method, "PUT");
        assert_eq!(buf.service.as_ref().unwrap().name, "users");
        assert_eq!(buf.request_body_type, RequestBodyType::FormData);
        assert_eq!(session.display_name().unwrap(), "Users by User id");
    }

    #[test]
    fn unresolved_row_cannot_be_edited() {
        let mut session = RouteEditSession::new();
        let err = session
            .begin_edit(&KateRoutes::new("/ghost", "GET", None), &[])
            .unwrap_err();
        assert!(matches!(err, KateError::Validation(_)));
        assert!(!session.is_open());
    }

    #[test]
    fn path_is_fixed_while_editing() {
        let (row, services) = row_with_route();
        let mut session = RouteEditSession::new();
        session.begin_edit(&row, &services).unwrap();
        assert!(session.set_path("/other").is_err());
        assert_eq!(session.buffer().unwrap().path, "/users/{user_id}");
    }

    #[test]
    fn validate_reports_first_problem() {
        let mut session = RouteEditSession::new();
        assert!(session.validate().is_err());

        session.begin_create().unwrap();
        let err = session.validate().unwrap_err();
        assert_eq!(err.to_string(), "Invalid route: no service selected");

        session.select_service(Service::new("users", vec![])).unwrap();
        let err = session.validate().unwrap_err();
        assert_eq!(err.to_string(), "Invalid route: path is empty");

        session.set_path("/users").unwrap();
        session.set_method(HttpMethod::Delete).unwrap();
        let edit = session.validate().unwrap();
        assert_eq!(edit.routes.method, "DELETE");
        assert!(edit.routes.route.is_none());
    }

    #[test]
    fn validate_rejects_unsupported_method_from_row() {
        let (mut row, services) = row_with_route();
        row.method = "PATCH".into();
        let mut session = RouteEditSession::new();
        session.begin_edit(&row, &services).unwrap();
        assert!(matches!(session.validate(), Err(KateError::Validation(_))));
    }

    #[test]
    fn second_begin_is_refused_and_cancel_closes() {
        let mut session = RouteEditSession::new();
        session.begin_create().unwrap();
        assert!(session.begin_create().is_err());
        session.cancel();
        assert!(!session.is_open());
        assert!(session.display_name().is_none());
        assert!(session.set_protected(true).is_err());
    }
}
