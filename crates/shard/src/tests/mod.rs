mod helpers;
mod plan_tests;
