//! In-memory storage backend.
//!
//! All state sits behind one mutex, so every operation (including order
//! placement) is atomic with respect to every other.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use pola_core::{CartItemId, OrderId, OrderStatus, Page, PageRequest, ProductId, SessionId};

use super::{
    CartStore, OrderStore, PlaceOrderError, ProductStore, RepositoryError, Store,
};
use crate::models::{
    CartItem, CartLine, CartProduct, NewOrder, NewProduct, Order, Product, ProductChanges,
};

#[derive(Debug, Default)]
struct State {
    products: BTreeMap<ProductId, Product>,
    cart_items: BTreeMap<CartItemId, CartItem>,
    orders: Vec<Order>,
    next_product_id: i32,
    next_cart_item_id: i32,
    next_order_id: i32,
}

impl State {
    fn line(&self, item: &CartItem) -> Result<CartLine, RepositoryError> {
        let product = self.products.get(&item.product_id).ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "cart item {} references missing product {}",
                item.id, item.product_id
            ))
        })?;
        Ok(CartLine {
            item: item.clone(),
            product: CartProduct::from(product),
        })
    }

    fn session_item(&self, id: CartItemId, session: &SessionId) -> Option<&CartItem> {
        self.cart_items
            .get(&id)
            .filter(|item| &item.session_id == session)
    }

    fn clear_session(&mut self, session: &SessionId) -> u64 {
        let before = self.cart_items.len();
        self.cart_items.retain(|_, item| &item.session_id != session);
        u64::try_from(before - self.cart_items.len()).unwrap_or_default()
    }
}

/// Process-local storage backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Sort, count and slice a filtered product list into a page.
fn paginate(
    mut products: Vec<Product>,
    page: PageRequest,
    order: impl FnMut(&Product, &Product) -> std::cmp::Ordering,
) -> Page<Product> {
    products.sort_by(order);
    let total = u64::try_from(products.len()).unwrap_or_default();
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let items = products
        .into_iter()
        .skip(offset)
        .take(usize::try_from(page.limit()).unwrap_or(usize::MAX))
        .collect();
    Page::new(items, total, page)
}

fn newest_first(a: &Product, b: &Product) -> std::cmp::Ordering {
    b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
}

fn by_name(a: &Product, b: &Product) -> std::cmp::Ordering {
    a.name.cmp(&b.name).then(a.id.cmp(&b.id))
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn list_products(&self, page: PageRequest) -> Result<Page<Product>, RepositoryError> {
        let state = self.state.lock().await;
        let products = state.products.values().cloned().collect();
        Ok(paginate(products, page, newest_first))
    }

    async fn list_products_by_category(
        &self,
        category: &str,
        page: PageRequest,
    ) -> Result<Page<Product>, RepositoryError> {
        let wanted = category.to_lowercase();
        let state = self.state.lock().await;
        let products = state
            .products
            .values()
            .filter(|p| p.category.to_lowercase() == wanted)
            .cloned()
            .collect();
        Ok(paginate(products, page, by_name))
    }

    async fn search_products(
        &self,
        query: &str,
        page: PageRequest,
    ) -> Result<Page<Product>, RepositoryError> {
        let needle = query.to_lowercase();
        let state = self.state.lock().await;
        let products = state
            .products
            .values()
            .filter(|p| {
                p.name.to_lowercase().contains(&needle)
                    || p.description.to_lowercase().contains(&needle)
                    || p.category.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        Ok(paginate(products, page, by_name))
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.state.lock().await.products.get(&id).cloned())
    }

    async fn create_product(&self, new: &NewProduct) -> Result<Product, RepositoryError> {
        let mut state = self.state.lock().await;
        if state.products.values().any(|p| p.sku == new.sku) {
            return Err(RepositoryError::Conflict(
                "a product with this SKU already exists".to_owned(),
            ));
        }

        state.next_product_id += 1;
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(state.next_product_id),
            name: new.name.clone(),
            description: new.description.clone(),
            price: new.price,
            category: new.category.clone(),
            image_url: new.image_url.clone(),
            specifications: new.specifications.clone(),
            stock_quantity: new.stock_quantity,
            sku: new.sku.clone(),
            weight: new.weight,
            dimensions: new.dimensions,
            created_at: now,
            updated_at: now,
        };
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: ProductId,
        changes: &ProductChanges,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut state = self.state.lock().await;
        let Some(product) = state.products.get_mut(&id) else {
            return Ok(None);
        };
        changes.apply(product);
        product.updated_at = Utc::now();
        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().await;
        if state.products.remove(&id).is_none() {
            return Ok(false);
        }
        state.cart_items.retain(|_, item| item.product_id != id);
        Ok(true)
    }

    async fn list_categories(&self) -> Result<Vec<String>, RepositoryError> {
        let state = self.state.lock().await;
        let mut categories: Vec<String> =
            state.products.values().map(|p| p.category.clone()).collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }

    async fn decrement_stock(
        &self,
        id: ProductId,
        quantity: i32,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().await;
        match state.products.get_mut(&id) {
            Some(product) if product.stock_quantity >= quantity => {
                product.stock_quantity -= quantity;
                product.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn cart_lines(&self, session: &SessionId) -> Result<Vec<CartLine>, RepositoryError> {
        let state = self.state.lock().await;
        // Ids are allocated in insertion order
        state
            .cart_items
            .values()
            .filter(|item| &item.session_id == session)
            .map(|item| state.line(item))
            .collect()
    }

    async fn cart_line(
        &self,
        id: CartItemId,
        session: &SessionId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let state = self.state.lock().await;
        state
            .session_item(id, session)
            .map(|item| state.line(item))
            .transpose()
    }

    async fn cart_line_for_product(
        &self,
        session: &SessionId,
        product: ProductId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let state = self.state.lock().await;
        state
            .cart_items
            .values()
            .find(|item| &item.session_id == session && item.product_id == product)
            .map(|item| state.line(item))
            .transpose()
    }

    async fn add_cart_item(
        &self,
        session: &SessionId,
        product: ProductId,
        quantity: i32,
    ) -> Result<CartLine, RepositoryError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        if !state.products.contains_key(&product) {
            return Err(RepositoryError::NotFound);
        }

        let now = Utc::now();
        let existing = state
            .cart_items
            .values_mut()
            .find(|item| &item.session_id == session && item.product_id == product);
        let id = if let Some(item) = existing {
            item.quantity += quantity;
            item.updated_at = now;
            item.id
        } else {
            state.next_cart_item_id += 1;
            let id = CartItemId::new(state.next_cart_item_id);
            state.cart_items.insert(
                id,
                CartItem {
                    id,
                    product_id: product,
                    quantity,
                    session_id: session.clone(),
                    user_id: None,
                    created_at: now,
                    updated_at: now,
                },
            );
            id
        };

        let item = state.cart_items.get(&id).ok_or(RepositoryError::NotFound)?;
        state.line(item)
    }

    async fn set_cart_quantity(
        &self,
        id: CartItemId,
        session: &SessionId,
        quantity: i32,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let mut state = self.state.lock().await;
        let Some(item) = state
            .cart_items
            .get_mut(&id)
            .filter(|item| &item.session_id == session)
        else {
            return Ok(None);
        };
        item.quantity = quantity;
        item.updated_at = Utc::now();
        let item = item.clone();
        state.line(&item).map(Some)
    }

    async fn delete_cart_item(
        &self,
        id: CartItemId,
        session: &SessionId,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().await;
        if state.session_item(id, session).is_none() {
            return Ok(false);
        }
        state.cart_items.remove(&id);
        Ok(true)
    }

    async fn clear_cart(&self, session: &SessionId) -> Result<u64, RepositoryError> {
        Ok(self.state.lock().await.clear_session(session))
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn place_order(&self, order: &NewOrder) -> Result<Order, PlaceOrderError> {
        let mut state = self.state.lock().await;

        // Validate everything before mutating anything
        let unchanged = order.lines.iter().all(|line| {
            state
                .session_item(line.cart_item_id, &order.session_id)
                .is_some_and(|item| item.quantity == line.quantity)
        });
        if !unchanged {
            return Err(PlaceOrderError::CartChanged);
        }
        for item in &order.items {
            let product = state
                .products
                .get(&item.product_id)
                .filter(|p| p.stock_quantity >= item.quantity)
                .ok_or(PlaceOrderError::InsufficientStock(item.product_id))?;
            if product.price != item.price {
                return Err(PlaceOrderError::PriceChanged(item.product_id));
            }
        }
        if state
            .orders
            .iter()
            .any(|o| o.order_number == order.order_number)
        {
            return Err(PlaceOrderError::DuplicateOrderNumber);
        }

        let now = Utc::now();
        for item in &order.items {
            if let Some(product) = state.products.get_mut(&item.product_id) {
                product.stock_quantity -= item.quantity;
                product.updated_at = now;
            }
        }

        state.next_order_id += 1;
        let placed = Order {
            id: OrderId::new(state.next_order_id),
            order_number: order.order_number.clone(),
            customer_name: order.customer_name.clone(),
            customer_email: order.customer_email.clone(),
            shipping_address: order.shipping_address.clone(),
            total: order.total,
            status: OrderStatus::Pending,
            session_id: order.session_id.clone(),
            user_id: None,
            items: order.items.clone(),
            created_at: now,
            updated_at: now,
        };
        state.orders.push(placed.clone());
        for line in &order.lines {
            state.cart_items.remove(&line.cart_item_id);
        }

        Ok(placed)
    }

    async fn get_order_by_number(
        &self,
        order_number: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .iter()
            .find(|o| o.order_number == order_number)
            .cloned())
    }

    async fn list_orders(&self, session: &SessionId) -> Result<Vec<Order>, RepositoryError> {
        let state = self.state.lock().await;
        // Orders are appended, so reverse insertion order is newest first
        Ok(state
            .orders
            .iter()
            .rev()
            .filter(|o| &o.session_id == session)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
