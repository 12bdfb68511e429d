//! Callable adapters - native functions, closures and members as script entry points
//!
//! Every native shape is reduced to one type-erased invoker with the same
//! contract: check arity, decode arguments left to right, run the native
//! body, push the results. Nothing native runs unless every argument decoded.

use super::context::CallContext;
use super::marshal::{FromScript, ReturnValue};
use super::types::{Signature, ValueKind};
use super::counters;
use crate::errors::{BindError, ErrorKind};
use crate::ffi::{identity, object};
use crate::infrastructure::config::CodecConfig;
use crate::infrastructure::logging::{log_bind, log_call_error};
use mlua::{Function, Lua, MultiValue};
use std::any::{type_name, TypeId};
use std::fmt;
use std::rc::Rc;

/// Fixed list of decodable parameters, implemented for tuples up to 8
pub trait ArgList: Sized + 'static {
    const ARITY: usize;

    fn kinds() -> Vec<ValueKind>;

    /// Decode the parameters starting at script position `first`
    fn decode(ctx: &CallContext<'_>, first: usize) -> Result<Self, BindError>;
}

/// Free functions, function pointers and closures taking `Args`
pub trait NativeFn<Args: ArgList>: 'static {
    type Output: ReturnValue;

    fn call(&self, args: Args) -> Self::Output;
}

/// Members taking their receiver by shared reference
pub trait NativeMethod<Recv, Args: ArgList>: 'static {
    type Output: ReturnValue;

    fn call(&self, receiver: &Recv, args: Args) -> Self::Output;
}

/// Members taking their receiver by exclusive reference
pub trait NativeMethodMut<Recv, Args: ArgList>: 'static {
    type Output: ReturnValue;

    fn call(&self, receiver: &mut Recv, args: Args) -> Self::Output;
}

macro_rules! count_idents {
    () => { 0 };
    ($head:ident $($tail:ident)*) => { 1 + count_idents!($($tail)*) };
}

macro_rules! impl_native_arity {
    ($($arg:ident),*) => {
        impl<$($arg: FromScript + 'static),*> ArgList for ($($arg,)*) {
            const ARITY: usize = count_idents!($($arg)*);

            fn kinds() -> Vec<ValueKind> {
                vec![$(<$arg as FromScript>::kind()),*]
            }

            #[allow(unused_variables, unused_mut, unused_assignments, clippy::unused_unit)]
            fn decode(ctx: &CallContext<'_>, first: usize) -> Result<Self, BindError> {
                let mut position = first;
                Ok(($(
                    {
                        let value = ctx.decode::<$arg>(position)?;
                        position += 1;
                        value
                    },
                )*))
            }
        }

        impl<Func, Ret, $($arg),*> NativeFn<($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Ret + 'static,
            Ret: ReturnValue,
            $($arg: FromScript + 'static,)*
        {
            type Output = Ret;

            #[allow(non_snake_case)]
            fn call(&self, ($($arg,)*): ($($arg,)*)) -> Ret {
                (self)($($arg),*)
            }
        }

        impl<Func, Recv, Ret, $($arg),*> NativeMethod<Recv, ($($arg,)*)> for Func
        where
            Func: Fn(&Recv, $($arg),*) -> Ret + 'static,
            Ret: ReturnValue,
            $($arg: FromScript + 'static,)*
        {
            type Output = Ret;

            #[allow(non_snake_case)]
            fn call(&self, receiver: &Recv, ($($arg,)*): ($($arg,)*)) -> Ret {
                (self)(receiver, $($arg),*)
            }
        }

        impl<Func, Recv, Ret, $($arg),*> NativeMethodMut<Recv, ($($arg,)*)> for Func
        where
            Func: Fn(&mut Recv, $($arg),*) -> Ret + 'static,
            Ret: ReturnValue,
            $($arg: FromScript + 'static,)*
        {
            type Output = Ret;

            #[allow(non_snake_case)]
            fn call(&self, receiver: &mut Recv, ($($arg,)*): ($($arg,)*)) -> Ret {
                (self)(receiver, $($arg),*)
            }
        }
    };
}

impl_native_arity!();
impl_native_arity!(A);
impl_native_arity!(A, B);
impl_native_arity!(A, B, C);
impl_native_arity!(A, B, C, D);
impl_native_arity!(A, B, C, D, E);
impl_native_arity!(A, B, C, D, E, F);
impl_native_arity!(A, B, C, D, E, F, G);
impl_native_arity!(A, B, C, D, E, F, G, H);

/// Which kind of native callable an adapter was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableShape {
    FreeFunction,
    FunctionPointer,
    Closure,
    /// `shared` is true for members taking `&self`
    Member { shared: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    pub type_id: TypeId,
    pub type_name: &'static str,
}

impl Owner {
    fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }
}

type Invoker = dyn Fn(&mut CallContext<'_>) -> Result<usize, BindError>;

fn invoker<F>(f: F) -> Rc<Invoker>
where
    F: Fn(&mut CallContext<'_>) -> Result<usize, BindError> + 'static,
{
    Rc::new(f)
}

/// A native callable with its signature, ready to be bound
#[derive(Clone)]
pub struct NativeCallable {
    shape: CallableShape,
    signature: Signature,
    owner: Option<Owner>,
    invoke: Rc<Invoker>,
}

impl NativeCallable {
    /// Free function item
    pub fn function<F, Args>(f: F) -> Self
    where
        F: NativeFn<Args>,
        Args: ArgList,
    {
        Self::free_standing(CallableShape::FreeFunction, f)
    }

    /// Plain function pointer, e.g. `add as fn(i32, i32) -> i32`
    pub fn pointer<F, Args>(f: F) -> Self
    where
        F: NativeFn<Args>,
        Args: ArgList,
    {
        Self::free_standing(CallableShape::FunctionPointer, f)
    }

    /// Closure owning its captured state for as long as any binding lives
    pub fn closure<F, Args>(f: F) -> Self
    where
        F: NativeFn<Args>,
        Args: ArgList,
    {
        Self::free_standing(CallableShape::Closure, f)
    }

    fn free_standing<F, Args>(shape: CallableShape, f: F) -> Self
    where
        F: NativeFn<Args>,
        Args: ArgList,
    {
        let signature = Signature::of::<Args, F::Output>();
        let invoke = invoker(move |ctx| {
            ctx.check_arity(Args::ARITY)?;
            let args = Args::decode(ctx, 1)?;
            f.call(args).push_results(ctx)
        });

        Self {
            shape,
            signature,
            owner: None,
            invoke,
        }
    }

    /// Member taking `&T`; the receiver is script position 1
    pub fn method<T, F, Args>(f: F) -> Self
    where
        T: 'static,
        F: NativeMethod<T, Args>,
        Args: ArgList,
    {
        let signature = Signature::of_method::<Args, F::Output>();
        let invoke = invoker(move |ctx| {
            ctx.check_arity(Args::ARITY + 1)?;
            let receiver = ctx.receiver::<T>(1)?;
            let guard = object::borrow_handle::<T>(&receiver)?;
            let this = object::live::<T>(&guard)?;
            let args = Args::decode(ctx, 2)?;
            let output = f.call(this, args);
            drop(guard);
            output.push_results(ctx)
        });

        Self {
            shape: CallableShape::Member { shared: true },
            signature,
            owner: Some(Owner::of::<T>()),
            invoke,
        }
    }

    /// Member taking `&mut T`; the receiver is script position 1
    pub fn method_mut<T, F, Args>(f: F) -> Self
    where
        T: 'static,
        F: NativeMethodMut<T, Args>,
        Args: ArgList,
    {
        let signature = Signature::of_method::<Args, F::Output>();
        let invoke = invoker(move |ctx| {
            ctx.check_arity(Args::ARITY + 1)?;
            let receiver = ctx.receiver::<T>(1)?;
            let args = Args::decode(ctx, 2)?;
            let mut guard = object::borrow_handle_mut::<T>(&receiver)?;
            let this = object::live_mut::<T>(&mut guard)?;
            let output = f.call(this, args);
            drop(guard);
            output.push_results(ctx)
        });

        Self {
            shape: CallableShape::Member { shared: false },
            signature,
            owner: Some(Owner::of::<T>()),
            invoke,
        }
    }

    #[inline]
    pub fn shape(&self) -> CallableShape {
        self.shape
    }

    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Number of script arguments expected, receiver included
    #[inline]
    pub fn arity(&self) -> usize {
        self.signature.arity()
    }

    pub fn owner(&self) -> Option<Owner> {
        self.owner
    }

    pub fn is_member(&self) -> bool {
        matches!(self.shape, CallableShape::Member { .. })
    }

    /// Run the adapter against an already populated context
    pub fn invoke(&self, ctx: &mut CallContext<'_>) -> Result<usize, BindError> {
        (self.invoke)(ctx)
    }
}

impl fmt::Debug for NativeCallable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeCallable")
            .field("shape", &self.shape)
            .field("signature", &self.signature)
            .field("owner", &self.owner.map(|owner| owner.type_name))
            .finish_non_exhaustive()
    }
}

/// Produce the script entry point for `callable`
///
/// Members are only bindable once their owning type has an identity.
pub fn bind(
    lua: &Lua,
    name: &str,
    callable: &NativeCallable,
    codec: &CodecConfig,
) -> Result<Function, BindError> {
    if let Some(owner) = callable.owner {
        identity::identity_of(owner.type_id)
            .ok_or_else(|| BindError::unregistered_type(owner.type_name).in_function(name))?;
    }

    let callable = callable.clone();
    let codec = codec.clone();
    let name: Rc<str> = Rc::from(name);
    log_bind(&name, callable.shape, &callable.signature);

    let function = lua.create_function(move |lua, args: MultiValue| -> mlua::Result<MultiValue> {
        counters::record_call();
        let mut ctx = CallContext::new(lua, &codec, args);
        match callable.invoke(&mut ctx) {
            Ok(count) => {
                debug_assert_eq!(count, ctx.result_count());
                Ok(ctx.into_results())
            }
            Err(error) => {
                counters::record_error();
                let error = error.in_function(&name);
                log_call_error(&name, &error);
                Err(error.into())
            }
        }
    })?;
    counters::record_entry_point();

    Ok(function)
}

/// Like [`bind`], but first checks the callable against a requested signature
pub fn bind_with_signature(
    lua: &Lua,
    name: &str,
    callable: &NativeCallable,
    requested: &Signature,
    codec: &CodecConfig,
) -> Result<Function, BindError> {
    if callable.signature() != requested {
        return Err(BindError::new(ErrorKind::SignatureMismatch {
            expected: requested.to_string(),
            found: callable.signature().to_string(),
        })
        .in_function(name));
    }

    bind(lua, name, callable, codec)
}
