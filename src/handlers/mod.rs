// handlers/mod.rs - HTTP handlers
//
// public:    no session required (login, health, landing)
// protected: require an authenticated session; gatekeeper middleware decides
//            which of them a session may reach

pub mod protected;
pub mod public;
