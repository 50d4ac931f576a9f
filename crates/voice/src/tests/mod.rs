//! Integrationstests der Sprach-Sitzung
//!
//! Alle Tests laufen gegen die Fakes aus `support`: ein Transport der
//! Hooks aufzeichnet und Peers verbinden/trennen kann, ein Backend mit
//! steuerbarer Mikrofon-Faehigkeit und eine konstante Sample-Quelle.

mod support;
