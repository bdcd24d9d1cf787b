//! Scenario tests spanning several launches of the app, plus command line parsing.

mod cli_tests;
