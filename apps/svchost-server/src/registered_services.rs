// Keeps every service crate linked so its factory reaches the inventory.
// Add a line here when a new crate under ./modules is created.
#![allow(unused_imports)]

use http_service as _;
use mail_service as _;
use user_service as _;
