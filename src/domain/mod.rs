// Domain layer - Widgets, traffic, transit and view state
pub mod traffic;
pub mod transit;
pub mod view;
pub mod widget;
