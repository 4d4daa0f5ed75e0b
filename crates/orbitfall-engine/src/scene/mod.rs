pub mod driver;
pub mod ledger;
pub mod manager;
pub mod outbox;
pub mod scene;
pub mod subarea;
