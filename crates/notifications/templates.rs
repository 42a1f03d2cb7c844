/// Values shown in the subscription confirmation email.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionConfirmation {
    pub customer_name: String,
    pub plan_name: String,
    /// Already formatted, e.g. `49.00 USD`.
    pub amount: String,
    pub billing_cycle: String,
    pub order_id: String,
}

impl SubscriptionConfirmation {
    pub fn subject(&self) -> String {
        format!("Your {} subscription is active", self.plan_name)
    }

    pub fn render_html(&self) -> String {
        let greeting = if self.customer_name.trim().is_empty() {
            "Hi there".to_string()
        } else {
            format!("Hi {}", escape_html(self.customer_name.trim()))
        };

        format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2>Subscription confirmed</h2>
  <p>{greeting},</p>
  <p>Thanks for subscribing. Your campaign is now active and growth work starts right away.</p>
  <table style="border-collapse: collapse; width: 100%;">
    <tr><td><strong>Order</strong></td><td>#{order_id}</td></tr>
    <tr><td><strong>Plan</strong></td><td>{plan}</td></tr>
    <tr><td><strong>Amount</strong></td><td>{amount}</td></tr>
    <tr><td><strong>Billing</strong></td><td>{cycle}</td></tr>
  </table>
  <p>You can manage your subscription from the dashboard at any time.</p>
</div>"#,
            order_id = escape_html(&self.order_id),
            plan = escape_html(&self.plan_name),
            amount = escape_html(&self.amount),
            cycle = escape_html(&self.billing_cycle),
        )
    }
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
