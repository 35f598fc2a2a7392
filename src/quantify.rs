
use std::mem::{size_of,size_of_val};
use std::collections::VecDeque;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::cell::{RefCell};

// This is similar to https://docs.rs/heapsize/0.4.2/heapsize/
// The derive macro is in the `quantifiable-derive` crate.

pub trait Quantifiable
{
	/// Get the total memory currently being employed by the implementing type. Both stack and heap.
	fn total_memory(&self) -> usize;
	/// Prints by stdout how much memory is used per component.
	fn print_memory_breakdown(&self);
	/// Get an estimation on how much memory the type could reach during the simulation.
	fn forecast_total_memory(&self) -> usize;
}

impl<T:Quantifiable> Quantifiable for Vec<T>
{
	fn total_memory(&self) -> usize
	{
		return size_of::<Vec<T>>() + self.iter().map(|e|e.total_memory()).sum::<usize>() + (self.capacity()-self.len())*size_of::<T>();
	}
	fn print_memory_breakdown(&self)
	{
		unimplemented!();
	}
	fn forecast_total_memory(&self) -> usize
	{
		unimplemented!();
	}
}

impl<A:Quantifiable, B:Quantifiable> Quantifiable for (A,B)
{
	fn total_memory(&self) -> usize
	{
		return self.0.total_memory()+self.1.total_memory();
	}
	fn print_memory_breakdown(&self)
	{
		unimplemented!();
	}
	fn forecast_total_memory(&self) -> usize
	{
		unimplemented!();
	}
}

impl<A:Quantifiable, B:Quantifiable, C:Quantifiable> Quantifiable for (A,B,C)
{
	fn total_memory(&self) -> usize
	{
		return self.0.total_memory()+self.1.total_memory()+self.2.total_memory();
	}
	fn print_memory_breakdown(&self)
	{
		unimplemented!();
	}
	fn forecast_total_memory(&self) -> usize
	{
		unimplemented!();
	}
}

/// Implements `Quantifiable` for types without heap usage, such as numbers and field-less enums.
macro_rules! quantifiable_simple
{
	($t:ty) =>
	{
		impl $crate::quantify::Quantifiable for $t
		{
			fn total_memory(&self) -> usize
			{
				return std::mem::size_of::<$t>();
			}
			fn print_memory_breakdown(&self)
			{
				unimplemented!();
			}
			fn forecast_total_memory(&self) -> usize
			{
				return std::mem::size_of::<$t>();
			}
		}
	}
}

quantifiable_simple!(bool);
quantifiable_simple!(i32);
quantifiable_simple!(i64);
quantifiable_simple!(u32);
quantifiable_simple!(u64);
quantifiable_simple!(usize);
quantifiable_simple!(f32);
quantifiable_simple!(f64);
quantifiable_simple!(rand::rngs::StdRng);

impl Quantifiable for String
{
	fn total_memory(&self) -> usize
	{
		return size_of::<String>() + self.capacity();
	}
	fn print_memory_breakdown(&self)
	{
		unimplemented!();
	}
	fn forecast_total_memory(&self) -> usize
	{
		unimplemented!();
	}
}

impl<T:Quantifiable> Quantifiable for VecDeque<T>
{
	fn total_memory(&self) -> usize
	{
		return size_of::<VecDeque<T>>() + self.iter().map(|e|e.total_memory()).sum::<usize>() + (self.capacity()-self.len())*size_of::<T>();
	}
	fn print_memory_breakdown(&self)
	{
		unimplemented!();
	}
	fn forecast_total_memory(&self) -> usize
	{
		unimplemented!();
	}
}

impl<A:Quantifiable, B:Quantifiable> Quantifiable for BTreeMap<A,B>
{
	fn total_memory(&self) -> usize
	{
		return size_of::<Self>() + self.iter().map(|(a,b)|a.total_memory()+b.total_memory()).sum::<usize>();
	}
	fn print_memory_breakdown(&self)
	{
		unimplemented!();
	}
	fn forecast_total_memory(&self) -> usize
	{
		unimplemented!();
	}
}

impl<A:Quantifiable> Quantifiable for BTreeSet<A>
{
	fn total_memory(&self) -> usize
	{
		return size_of::<Self>() + self.len()*size_of::<A>();
	}
	fn print_memory_breakdown(&self)
	{
		unimplemented!();
	}
	fn forecast_total_memory(&self) -> usize
	{
		unimplemented!();
	}
}

impl<T:?Sized> Quantifiable for Rc<T>
{
	fn total_memory(&self) -> usize
	{
		return size_of::<Rc<T>>();
	}
	fn print_memory_breakdown(&self)
	{
		unimplemented!();
	}
	fn forecast_total_memory(&self) -> usize
	{
		unimplemented!();
	}
}

impl<T:Quantifiable+?Sized> Quantifiable for Box<T>
{
	fn total_memory(&self) -> usize
	{
		return size_of::<Box<T>>() + T::total_memory(self);
	}
	fn print_memory_breakdown(&self)
	{
		unimplemented!();
	}
	fn forecast_total_memory(&self) -> usize
	{
		unimplemented!();
	}
}

impl<T:Quantifiable> Quantifiable for Option<T>
{
	fn total_memory(&self) -> usize
	{
		match self
		{
			&None => size_of::<Option<T>>(),
			&Some(ref thing) => thing.total_memory(),
		}
	}
	fn print_memory_breakdown(&self)
	{
		unimplemented!();
	}
	fn forecast_total_memory(&self) -> usize
	{
		unimplemented!();
	}
}

impl<T:Quantifiable+?Sized> Quantifiable for RefCell<T>
{
	fn total_memory(&self) -> usize
	{
		//Note: BorrowFlag=isize
		self.borrow().total_memory() + size_of_val(self)
	}
	fn print_memory_breakdown(&self)
	{
		unimplemented!();
	}
	fn forecast_total_memory(&self) -> usize
	{
		unimplemented!();
	}
}

pub fn human_bytes(byte_amount:usize) -> String
{
	if byte_amount<3000
	{
		return format!("{} bytes",byte_amount);
	}
	let kb_amount=byte_amount as f64 / 1024.;
	if kb_amount<3000f64
	{
		return format!("{} KB",kb_amount);
	}
	let mb_amount=kb_amount / 1024.;
	if mb_amount<3000f64
	{
		return format!("{} MB",mb_amount);
	}
	let gb_amount=mb_amount / 1024.;
	return format!("{} GB",gb_amount);
}

#[cfg(test)]
mod tests
{
	use super::*;
	#[test]
	fn nested_containers_add_up()
	{
		let list:Vec<usize> = Vec::with_capacity(4);
		assert_eq!(list.total_memory(), size_of::<Vec<usize>>() + 4*size_of::<usize>());
		let pair=(3usize,Some(2i64));
		assert_eq!(pair.total_memory(), size_of::<usize>()+size_of::<i64>());
	}
	#[test]
	fn human_bytes_units()
	{
		assert_eq!(human_bytes(100),"100 bytes");
		assert_eq!(human_bytes(4096),"4 KB");
	}
}

