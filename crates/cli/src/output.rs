//! Terminal rendering.

#![allow(clippy::print_stdout)]

use julid_storefront::models::{CartSnapshot, CheckoutReceipt, CustomOrder, OrderRecord, Product};
use julid_storefront::notice::Notice;
use julid_storefront::services::CartMode;

pub fn notices(notices: &[Notice]) {
    for notice in notices {
        println!("{notice}");
    }
}

pub fn products(products: &[Product]) {
    if products.is_empty() {
        println!("No products available.");
        return;
    }
    for product in products {
        println!(
            "{:>5}  {:<40} {:>10}  {}",
            product.id, product.name, product.price, product.category
        );
    }
}

pub fn product(product: &Product) {
    println!("#{} {}", product.id, product.name);
    println!("  Price:    {}", product.price);
    println!("  Category: {}", product.category);
    if let Some(image) = &product.image_ref {
        println!("  Image:    {image}");
    }
    if !product.description.is_empty() {
        println!();
        println!("{}", product.description);
    }
}

pub fn cart(cart: &CartSnapshot, mode: CartMode) {
    if cart.is_empty() {
        println!("Your cart is empty.");
    } else {
        for line in cart {
            let marker = if line.id.is_provisional() { "*" } else { " " };
            println!(
                "{:>5}{marker} {:<40} {:>4} x {:>10} = {:>10}",
                line.id,
                line.product.name,
                line.quantity,
                line.product.price,
                line.line_total()
            );
        }
        println!("Items: {}  Total: {}", cart.item_count(), cart.total());
    }
    if mode == CartMode::Degraded {
        println!("(offline: * lines are not saved and are lost when this command exits)");
    }
}

pub fn receipt(receipt: &CheckoutReceipt) {
    for order in &receipt.orders {
        let notified = if order.notified { "" } else { " (notification pending)" };
        println!(
            "Order {} for cart line {}: {}{notified}",
            order.order_id, order.line_id, order.total
        );
    }
    println!("Checkout {}: total {}", receipt.run_id, receipt.total());
}

pub fn orders(orders: &[OrderRecord]) {
    if orders.is_empty() {
        println!("No orders yet.");
        return;
    }
    for order in orders {
        let id = order
            .id
            .map_or_else(|| "-".to_string(), |id| id.to_string());
        let total = order
            .total
            .map_or_else(|| "-".to_string(), |t| t.to_string());
        println!(
            "{id:>5}  {:<40} {:>10}  {}",
            order.product_name.as_deref().unwrap_or("(unnamed)"),
            total,
            order.status
        );
    }
}

pub fn custom_orders(orders: &[CustomOrder]) {
    if orders.is_empty() {
        println!("No custom orders yet.");
        return;
    }
    for order in orders {
        println!("{:>5}  {:<10} {}", order.id, order.status, order.description);
    }
}

pub fn line(text: &str) {
    println!("{text}");
}
