// Order placement and administration
pub mod orders;

// Gateway checkout, verification and credential selection
pub mod payments;
