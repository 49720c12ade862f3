pub mod order_repository;
pub mod review_eligibility;
