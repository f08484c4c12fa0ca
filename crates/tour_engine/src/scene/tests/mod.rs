//! Navigation and residency scenarios across the whole scene module

mod residency_scenarios;
