// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Message templates for every notification the desk sends.

use rust_decimal::Decimal;
use serde_json::json;

use crate::storage::{AccountType, OrderStatus};

const BRAND: &str = "BharatBit OTC Desk";

#[derive(Debug, Clone, PartialEq)]
pub enum Template {
    RegistrationOtp {
        code: String,
    },
    TwoFactorOtp {
        code: String,
    },
    PasswordReset {
        token: String,
    },
    AdminNewRegistration {
        client_uid: String,
        email: String,
        mobile: String,
        account_type: AccountType,
        company_name: Option<String>,
    },
    AdminKycSubmitted {
        user_id: String,
        client_uid: String,
        email: String,
        mobile: String,
    },
    KycApproved,
    KycRejected {
        reason: String,
    },
    OrderStatusUpdate {
        order_ref: String,
        status: OrderStatus,
        asset: String,
        quantity: Decimal,
    },
    WalletVerified {
        asset: String,
        address: String,
    },
    WalletRejected {
        asset: String,
        address: String,
        notes: Option<String>,
    },
    ClientKycDetails {
        client_uid: String,
        email: String,
        mobile: String,
        pan_number: Option<String>,
        aadhaar_number: Option<String>,
        passport_number: Option<String>,
        is_nri: bool,
        address: Option<String>,
    },
    ClientWalletDetails {
        client_uid: String,
        email: String,
        wallet_type: Option<String>,
        exchange_name: Option<String>,
        asset: String,
        wallet_address: String,
        notes: Option<String>,
    },
    ClientBankDetails {
        client_uid: String,
        email: String,
        account_holder: String,
        account_number: String,
        ifsc_code: String,
        bank_name: Option<String>,
        branch: Option<String>,
        account_type: Option<String>,
    },
}

/// A template rendered for all channels.
#[derive(Debug, Clone)]
pub struct RenderedMessage {
    /// Email subject, also the push title.
    pub subject: String,
    /// Plain text for SMS and push bodies.
    pub text: String,
    pub html: String,
    /// Extra payload attached to push notifications.
    pub data: serde_json::Value,
}

impl Template {
    /// Stable name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Template::RegistrationOtp { .. } => "registration_otp",
            Template::TwoFactorOtp { .. } => "two_factor_otp",
            Template::PasswordReset { .. } => "password_reset",
            Template::AdminNewRegistration { .. } => "admin_new_registration",
            Template::AdminKycSubmitted { .. } => "admin_kyc_submitted",
            Template::KycApproved => "kyc_approved",
            Template::KycRejected { .. } => "kyc_rejected",
            Template::OrderStatusUpdate { .. } => "order_status_update",
            Template::WalletVerified { .. } => "wallet_verified",
            Template::WalletRejected { .. } => "wallet_rejected",
            Template::ClientKycDetails { .. } => "client_kyc_details",
            Template::ClientWalletDetails { .. } => "client_wallet_details",
            Template::ClientBankDetails { .. } => "client_bank_details",
        }
    }

    pub fn render(&self) -> RenderedMessage {
        match self {
            Template::RegistrationOtp { code } | Template::TwoFactorOtp { code } => {
                let text = format!(
                    "Your BharatBit OTP is: {code}. Valid for 10 minutes. Do not share with anyone."
                );
                let html = layout(
                    "Verification Code",
                    &format!(
                        "<p>Your one-time password is:</p>\
                         <p style=\"font-size:32px;letter-spacing:8px;font-weight:700\">{}</p>\
                         <p>This code is valid for 10 minutes. Never share it with anyone.</p>",
                        escape_html(code)
                    ),
                );
                RenderedMessage {
                    subject: "Your BharatBit OTP Code".into(),
                    text,
                    html,
                    data: json!({ "type": self.kind() }),
                }
            }
            Template::PasswordReset { token } => RenderedMessage {
                subject: "Reset your BharatBit password".into(),
                text: format!("Use this token to reset your password within 1 hour: {token}"),
                html: layout(
                    "Password Reset",
                    &format!(
                        "<p>We received a request to reset your password.</p>\
                         <p>Reset token: <code>{}</code></p>\
                         <p>The token expires in 1 hour. If you did not request this, ignore this email.</p>",
                        escape_html(token)
                    ),
                ),
                data: json!({ "type": self.kind() }),
            },
            Template::AdminNewRegistration {
                client_uid,
                email,
                mobile,
                account_type,
                company_name,
            } => {
                let kind = match account_type {
                    AccountType::Individual => "Individual",
                    AccountType::Corporate => "Corporate",
                };
                let company = company_name.as_deref().unwrap_or("N/A");
                RenderedMessage {
                    subject: format!("New {kind} registration - {email}"),
                    text: format!("New {kind} registration: {email} / {mobile} ({company})"),
                    html: layout(
                        "New Registration",
                        &table(&[
                            ("Client ID", client_uid),
                            ("Email", email),
                            ("Mobile", mobile),
                            ("Account Type", kind),
                            ("Company", company),
                        ]),
                    ),
                    data: json!({ "type": self.kind() }),
                }
            }
            Template::AdminKycSubmitted {
                user_id,
                client_uid,
                email,
                mobile,
            } => RenderedMessage {
                subject: format!("KYC Submission - Client {client_uid}"),
                text: format!("KYC submitted by {email} ({mobile}). Pending review."),
                html: layout(
                    "New KYC Submission",
                    &format!(
                        "{}<p>Please review the submitted documents in the admin panel.</p>",
                        table(&[("Client ID", client_uid), ("Email", email), ("Mobile", mobile)])
                    ),
                ),
                data: json!({ "type": self.kind(), "user_id": user_id }),
            },
            Template::KycApproved => RenderedMessage {
                subject: "KYC Approved - Start Trading Now".into(),
                text: "Congratulations! Your KYC has been approved. You can now start trading."
                    .into(),
                html: layout(
                    "KYC Approved",
                    "<p>Your KYC verification is complete. You can now place buy and sell orders.</p>",
                ),
                data: json!({ "type": self.kind(), "screen": "dashboard" }),
            },
            Template::KycRejected { reason } => RenderedMessage {
                subject: "KYC Verification - Additional Information Required".into(),
                text: "Your KYC needs additional information. Please check the app for details."
                    .into(),
                html: layout(
                    "KYC Requires Attention",
                    &format!(
                        "<p>We could not verify your documents.</p><p>Reason: {}</p>\
                         <p>Please resubmit your KYC from the app.</p>",
                        escape_html(reason)
                    ),
                ),
                data: json!({ "type": self.kind(), "screen": "kyc", "reason": reason }),
            },
            Template::OrderStatusUpdate {
                order_ref,
                status,
                asset,
                quantity,
            } => {
                let text = match status {
                    OrderStatus::PaymentConfirmed => {
                        format!("Payment received for order #{order_ref}. Processing your order.")
                    }
                    OrderStatus::Processing => format!("Order #{order_ref} is being processed."),
                    OrderStatus::Completed => {
                        format!("Order #{order_ref} completed! {quantity} {asset} has been settled.")
                    }
                    OrderStatus::Cancelled => format!("Order #{order_ref} has been cancelled."),
                    OrderStatus::AwaitingPayment => {
                        format!("Order #{order_ref} is awaiting payment.")
                    }
                };
                RenderedMessage {
                    subject: format!("Order Update #{order_ref}"),
                    html: layout("Order Update", &format!("<p>{}</p>", escape_html(&text))),
                    text,
                    data: json!({
                        "type": self.kind(),
                        "order_id": order_ref,
                        "status": status.as_str(),
                        "screen": "orders",
                    }),
                }
            }
            Template::WalletVerified { asset, address } => RenderedMessage {
                subject: format!("{asset} wallet verified"),
                text: format!("Your {asset} wallet {} has been verified.", short_address(address)),
                html: layout(
                    "Wallet Verified",
                    &table(&[("Asset", asset), ("Address", address)]),
                ),
                data: json!({ "type": self.kind(), "screen": "wallets" }),
            },
            Template::WalletRejected {
                asset,
                address,
                notes,
            } => {
                let notes = notes.as_deref().unwrap_or("Please contact support.");
                RenderedMessage {
                    subject: format!("{asset} wallet could not be verified"),
                    text: format!(
                        "Your {asset} wallet {} was rejected. {notes}",
                        short_address(address)
                    ),
                    html: layout(
                        "Wallet Rejected",
                        &table(&[("Asset", asset), ("Address", address), ("Notes", notes)]),
                    ),
                    data: json!({ "type": self.kind(), "screen": "wallets" }),
                }
            }
            Template::ClientKycDetails {
                client_uid,
                email,
                mobile,
                pan_number,
                aadhaar_number,
                passport_number,
                is_nri,
                address,
            } => {
                let residency = if *is_nri {
                    "NRI / Non-Resident"
                } else {
                    "Indian Resident"
                };
                RenderedMessage {
                    subject: format!("KYC Submission - Client {client_uid}"),
                    text: format!("KYC details from client {client_uid} ({email}). Pending review."),
                    html: layout(
                        "New KYC Submission",
                        &format!(
                            "{}<p>Please review the submitted KYC documents in the admin panel \
                             and approve or reject accordingly.</p>",
                            table(&[
                                ("Client ID", client_uid),
                                ("Email", email),
                                ("Mobile", mobile),
                                ("PAN Number", or_na(pan_number)),
                                ("Aadhaar Number", or_na(aadhaar_number)),
                                ("Passport Number", or_na(passport_number)),
                                ("Client Type", residency),
                                ("Address", or_na(address)),
                            ])
                        ),
                    ),
                    data: json!({ "type": self.kind(), "client_uid": client_uid }),
                }
            }
            Template::ClientWalletDetails {
                client_uid,
                email,
                wallet_type,
                exchange_name,
                asset,
                wallet_address,
                notes,
            } => {
                let wallet_type = match wallet_type.as_deref() {
                    Some("exchange") => "Exchange Wallet",
                    Some("custodial") => "Custodial Wallet",
                    Some("self_custody") => "Self-Custody Wallet",
                    Some(other) => other,
                    None => "N/A",
                };
                RenderedMessage {
                    subject: format!("Wallet Verification Request - Client {client_uid}"),
                    text: format!("Client {client_uid} submitted a {asset} wallet for verification."),
                    html: layout(
                        "Wallet Verification Request",
                        &format!(
                            "{}<p>Please verify the wallet ownership before approving.</p>",
                            table(&[
                                ("Client ID", client_uid),
                                ("Email", email),
                                ("Wallet Type", wallet_type),
                                ("Exchange/Provider", or_na(exchange_name)),
                                ("Asset", asset),
                                ("Wallet Address", wallet_address),
                                ("Notes", notes.as_deref().unwrap_or("None")),
                            ])
                        ),
                    ),
                    data: json!({ "type": self.kind(), "client_uid": client_uid }),
                }
            }
            Template::ClientBankDetails {
                client_uid,
                email,
                account_holder,
                account_number,
                ifsc_code,
                bank_name,
                branch,
                account_type,
            } => {
                let masked = mask_account(account_number);
                RenderedMessage {
                    subject: format!("Bank Account Verification - Client {client_uid}"),
                    text: format!("Client {client_uid} submitted bank account {masked} for verification."),
                    html: layout(
                        "Bank Account Verification Request",
                        &format!(
                            "{}<p>Please verify the account with a test credit of Rs 1 and \
                             update the verification status once confirmed.</p>",
                            table(&[
                                ("Client ID", client_uid),
                                ("Email", email),
                                ("Account Holder", account_holder),
                                ("Account Number", &masked),
                                ("IFSC Code", ifsc_code),
                                ("Bank Name", or_na(bank_name)),
                                ("Branch", or_na(branch)),
                                ("Account Type", account_type.as_deref().unwrap_or("savings")),
                            ])
                        ),
                    ),
                    data: json!({ "type": self.kind(), "client_uid": client_uid }),
                }
            }
        }
    }
}

fn or_na(value: &Option<String>) -> &str {
    value.as_deref().filter(|v| !v.is_empty()).unwrap_or("N/A")
}

/// Only the last four digits of an account number leave the desk.
fn mask_account(number: &str) -> String {
    let digits: Vec<char> = number.trim().chars().collect();
    if digits.len() < 4 {
        return number.trim().to_string();
    }
    let tail: String = digits[digits.len() - 4..].iter().collect();
    format!("XXXX{tail}")
}

fn layout(heading: &str, content: &str) -> String {
    format!(
        "<div style=\"font-family:Arial,sans-serif;max-width:600px;margin:0 auto\">\
         <div style=\"background:#1a1a2e;color:#fff;padding:20px\"><h1 style=\"margin:0\">{BRAND}</h1>\
         <p style=\"margin:4px 0 0\">{heading}</p></div>\
         <div style=\"padding:24px;border:1px solid #e0e0e0\">{content}</div>\
         <p style=\"color:#666;font-size:12px;text-align:center\">{BRAND} - Premium Crypto Trading</p></div>"
    )
}

fn table(rows: &[(&str, &str)]) -> String {
    let mut html = String::from("<table style=\"width:100%;border-collapse:collapse\">");
    for (label, value) in rows {
        html.push_str(&format!(
            "<tr><td style=\"padding:8px;font-weight:600\">{label}</td><td style=\"padding:8px\">{}</td></tr>",
            escape_html(value)
        ));
    }
    html.push_str("</table>");
    html
}

fn short_address(address: &str) -> String {
    if address.len() > 12 && address.is_ascii() {
        format!("{}...{}", &address[..6], &address[address.len() - 4..])
    } else {
        address.to_string()
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_text_carries_the_code() {
        let msg = Template::RegistrationOtp {
            code: "123456".into(),
        }
        .render();
        assert!(msg.text.contains("123456"));
        assert!(msg.html.contains("123456"));
    }

    #[test]
    fn order_update_mentions_status_specific_text() {
        let msg = Template::OrderStatusUpdate {
            order_ref: "abcd1234".into(),
            status: OrderStatus::Completed,
            asset: "USDT".into(),
            quantity: Decimal::from(100),
        }
        .render();
        assert_eq!(msg.text, "Order #abcd1234 completed! 100 USDT has been settled.");
        assert_eq!(msg.data["status"], "completed");
    }

    #[test]
    fn user_supplied_text_is_escaped() {
        let msg = Template::KycRejected {
            reason: "<script>x</script>".into(),
        }
        .render();
        assert!(!msg.html.contains("<script>"));
        assert!(msg.html.contains("&lt;script&gt;"));
    }

    #[test]
    fn bank_details_only_show_the_last_four_digits() {
        let msg = Template::ClientBankDetails {
            client_uid: "1000001".into(),
            email: "a@example.com".into(),
            account_holder: "Asha Rao".into(),
            account_number: "001234567890".into(),
            ifsc_code: "HDFC0001234".into(),
            bank_name: None,
            branch: None,
            account_type: None,
        }
        .render();
        assert!(msg.html.contains("XXXX7890"));
        assert!(!msg.html.contains("001234567890"));
        assert!(msg.text.contains("XXXX7890"));
        assert_eq!(msg.subject, "Bank Account Verification - Client 1000001");
        assert_eq!(mask_account("123"), "123");
    }

    #[test]
    fn wallet_types_get_readable_names() {
        let msg = Template::ClientWalletDetails {
            client_uid: "1000001".into(),
            email: "a@example.com".into(),
            wallet_type: Some("self_custody".into()),
            exchange_name: None,
            asset: "USDT".into(),
            wallet_address: "TXYZabcdefghijklmnop1234".into(),
            notes: None,
        }
        .render();
        assert!(msg.html.contains("Self-Custody Wallet"));
        assert!(msg.html.contains("TXYZabcdefghijklmnop1234"));
    }

    #[test]
    fn long_addresses_are_shortened() {
        assert_eq!(short_address("TXYZabcdefghijklmnop1234"), "TXYZab...1234");
        assert_eq!(short_address("short"), "short");
    }
}
