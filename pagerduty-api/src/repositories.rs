use crate::endpoints::{services::ListServices, users::GetCurrentUser};

pub struct ServiceRepository;

impl ServiceRepository {
    pub fn new() -> Self {
        Self {}
    }

    pub fn list(&self) -> ListServices {
        ListServices::default()
    }
}

pub struct UserRepository;

impl UserRepository {
    pub fn new() -> Self {
        Self {}
    }

    pub fn me(&self) -> GetCurrentUser {
        GetCurrentUser::new()
    }
}
